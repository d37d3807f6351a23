/// Component definitions for the physics layer.
///
/// Transforms are replaced wholesale each tick rather than edited in place:
/// the integration step is the only writer, and interpolation and collider
/// derivation read the committed value.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::{FixedPoint, FixedPointVector2};
use super::collision::Aabb;

// ============================================================================
// Identity
// ============================================================================

/// Stable body identifier used by snapshots and draw ordering.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

// ============================================================================
// Transform
// ============================================================================

/// Extra interpolation waypoint recorded during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Midpoint {
    #[default]
    None,
    Waypoint(FixedPointVector2),
}

/// The last two committed positions of a body, plus an optional waypoint
/// between them.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimTransform {
    position: FixedPointVector2,
    position_last_tick: FixedPointVector2,
    midpoint: Midpoint,
}

impl SimTransform {
    /// A body at rest at `position`.
    pub fn new(position: FixedPointVector2) -> Self {
        Self::from_parts(position, position, Midpoint::None)
    }

    pub fn from_parts(position: FixedPointVector2, position_last_tick: FixedPointVector2, midpoint: Midpoint) -> Self {
        Self { position, position_last_tick, midpoint }
    }

    pub fn position(&self) -> FixedPointVector2 {
        self.position
    }

    pub fn position_last_tick(&self) -> FixedPointVector2 {
        self.position_last_tick
    }

    pub fn midpoint(&self) -> Midpoint {
        self.midpoint
    }

    /// The transform after moving to `target`. The current position becomes
    /// the previous one and any midpoint is dropped.
    pub fn advanced(&self, target: FixedPointVector2) -> Self {
        Self::from_parts(target, self.position, Midpoint::None)
    }

    pub fn with_midpoint(&self, midpoint: Midpoint) -> Self {
        Self::from_parts(self.position, self.position_last_tick, midpoint)
    }

    /// Fraction of the tick at which the path reaches the midpoint:
    /// `|previous - midpoint| / (|current - midpoint| + |previous - midpoint| + KLUDGE)`.
    pub fn midpoint_split(&self) -> Option<FixedPoint> {
        let Midpoint::Waypoint(midpoint) = self.midpoint else {
            return None;
        };
        let magnitude = (self.position - midpoint).magnitude();
        let last_magnitude = (self.position_last_tick - midpoint).magnitude();
        Some(last_magnitude / (magnitude + last_magnitude + FixedPoint::KLUDGE))
    }

    /// Display position at `delta` in `[0, 1]` of the way from the previous
    /// tick to the current one.
    ///
    /// With a midpoint the path is two straight segments meeting at the
    /// waypoint, split at [`Self::midpoint_split`].
    pub fn interpolate(&self, delta: FixedPoint) -> FixedPointVector2 {
        let (Midpoint::Waypoint(midpoint), Some(split)) = (self.midpoint, self.midpoint_split()) else {
            return FixedPointVector2::interpolate(self.position_last_tick, self.position, delta);
        };

        if delta < split {
            let t = (delta - split) / split + FixedPoint::ONE;
            FixedPointVector2::interpolate(self.position_last_tick, midpoint, t)
        } else {
            let t = (delta - split) / (FixedPoint::ONE - split);
            FixedPointVector2::interpolate(midpoint, self.position, t)
        }
    }
}

// ============================================================================
// Rigidbody
// ============================================================================

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimRigidbody {
    pub direction: FixedPointVector2,
    pub speed: FixedPoint,
    /// `direction * speed` as of the last integrated tick.
    pub velocity: FixedPointVector2,
    /// Kinematic bodies are never moved by integration.
    pub kinematic: bool,
}

impl SimRigidbody {
    pub fn new(direction: FixedPointVector2, speed: FixedPoint) -> Self {
        Self {
            direction,
            speed,
            velocity: FixedPointVector2::ZERO,
            kinematic: false,
        }
    }

    pub fn kinematic() -> Self {
        Self { kinematic: true, ..default() }
    }
}

// ============================================================================
// Colliders
// ============================================================================

/// Box collider. `size` holds the half extents, `center` the offset from
/// the body's position.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub size: FixedPointVector2,
    pub center: FixedPointVector2,
}

impl BoxCollider {
    pub fn new(size: FixedPointVector2, center: FixedPointVector2) -> Self {
        Self { size, center }
    }

    pub fn to_aabb(&self, point: FixedPointVector2) -> Aabb {
        Aabb::from_min_max(point - self.center - self.size, point - self.center + self.size)
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleCollider {
    pub center: FixedPointVector2,
    pub radius: FixedPoint,
}

impl CircleCollider {
    pub fn new(center: FixedPointVector2, radius: FixedPoint) -> Self {
        Self { center, radius }
    }

    pub fn to_aabb(&self, point: FixedPointVector2) -> Aabb {
        let origin = point + self.center;
        Aabb::from_min_max(origin - self.radius, origin + self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> FixedPointVector2 {
        FixedPointVector2::from_ints(x, y)
    }

    fn bounced() -> SimTransform {
        SimTransform::from_parts(p(8, 5), p(8, 5), Midpoint::Waypoint(p(10, 5)))
    }

    #[test]
    fn test_advanced_shifts_history_and_drops_midpoint() {
        let transform = SimTransform::new(p(1, 2)).with_midpoint(Midpoint::Waypoint(p(3, 3)));
        let next = transform.advanced(p(4, 6));
        assert_eq!(next.position(), p(4, 6));
        assert_eq!(next.position_last_tick(), p(1, 2));
        assert_eq!(next.midpoint(), Midpoint::None);
    }

    #[test]
    fn test_interpolate_boundaries() {
        let transform = SimTransform::new(p(-3, 7)).advanced(p(5, 1));
        assert_eq!(transform.interpolate(FixedPoint::ZERO), p(-3, 7));
        assert_eq!(transform.interpolate(FixedPoint::ONE), p(5, 1));
        assert_eq!(transform.interpolate(FixedPoint::HALF), p(1, 4));

        let bounced = bounced();
        assert_eq!(bounced.interpolate(FixedPoint::ZERO), p(8, 5));
        assert_eq!(bounced.interpolate(FixedPoint::ONE), p(8, 5));
    }

    #[test]
    fn test_interpolate_passes_through_midpoint() {
        let transform = bounced();
        let split = transform.midpoint_split().unwrap();
        assert!(split < FixedPoint::HALF && split > FixedPoint::from_ratio(49, 100));
        assert_eq!(transform.interpolate(split), p(10, 5));
    }

    #[test]
    fn test_midpoint_interpolation_is_continuous_at_split() {
        let transforms = [
            bounced(),
            SimTransform::from_parts(p(20, 0), p(0, 0), Midpoint::Waypoint(p(5, 9))),
            SimTransform::from_parts(p(-4, 3), p(7, 7), Midpoint::Waypoint(p(-1, 12))),
        ];
        let tolerance = FixedPoint::from_ratio(1, 1000);

        for transform in transforms {
            let split = transform.midpoint_split().unwrap();
            let at = transform.interpolate(split);
            let before = transform.interpolate(split - FixedPoint::EPSILON);
            assert!((at.x - before.x).abs() <= tolerance, "{} vs {}", at, before);
            assert!((at.y - before.y).abs() <= tolerance, "{} vs {}", at, before);
        }
    }

    #[test]
    fn test_midpoint_on_previous_position() {
        let transform = SimTransform::from_parts(p(6, 0), p(0, 0), Midpoint::Waypoint(p(0, 0)));
        assert_eq!(transform.midpoint_split(), Some(FixedPoint::ZERO));
        assert_eq!(transform.interpolate(FixedPoint::ZERO), p(0, 0));
        assert_eq!(transform.interpolate(FixedPoint::HALF), p(3, 0));
        assert_eq!(transform.interpolate(FixedPoint::ONE), p(6, 0));
    }

    #[test]
    fn test_box_collider_aabb() {
        let collider = BoxCollider::new(p(2, 1), p(1, 0));
        let aabb = collider.to_aabb(p(10, 10));
        assert_eq!(aabb, Aabb::from_min_max(p(7, 9), p(11, 11)));
    }

    #[test]
    fn test_circle_collider_aabb() {
        let collider = CircleCollider::new(p(0, 2), FixedPoint::from_int(3));
        let aabb = collider.to_aabb(p(1, 1));
        assert_eq!(aabb, Aabb::from_min_max(p(-2, 0), p(4, 6)));
    }
}
