/// Axis-aligned bounding boxes and world-bounds reflection.
///
/// Shapes here are plain values derived from a collider and the owning
/// body's position; nothing in this module touches the ECS.

use serde::{Deserialize, Serialize};

use crate::math::{FixedPoint, FixedPointVector2};

// ============================================================================
// AABB
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aabb {
    pub min: FixedPointVector2,
    pub max: FixedPointVector2,
}

impl Aabb {
    pub fn from_min_max(min: FixedPointVector2, max: FixedPointVector2) -> Self {
        Self { min, max }
    }

    /// Touching edges count as an overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, point: FixedPointVector2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn center(&self) -> FixedPointVector2 {
        (self.min + self.max) / FixedPoint::TWO
    }

    pub fn half_extents(&self) -> FixedPointVector2 {
        (self.max - self.min) / FixedPoint::TWO
    }

    pub fn clamp_point(&self, point: FixedPointVector2) -> FixedPointVector2 {
        FixedPointVector2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}

// ============================================================================
// Bounds Reflection
// ============================================================================

/// Outcome of a step that left the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reflection {
    /// First point on the step's path that touches a wall.
    pub contact: FixedPointVector2,
    /// End of the step after bouncing, clamped inside the bounds.
    pub target: FixedPointVector2,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Reflects the step `from -> to` off the walls of `bounds`.
///
/// Returns `None` when `to` is inside the bounds.
pub fn reflect_step(bounds: &Aabb, from: FixedPointVector2, to: FixedPointVector2) -> Option<Reflection> {
    let x = axis_crossing(from.x, to.x, bounds.min.x, bounds.max.x);
    let y = axis_crossing(from.y, to.y, bounds.min.y, bounds.max.y);

    let t = match (x, y) {
        (None, None) => return None,
        (Some((tx, _)), None) => tx,
        (None, Some((ty, _))) => ty,
        (Some((tx, _)), Some((ty, _))) => tx.min(ty),
    };

    let contact = bounds.clamp_point(FixedPointVector2::interpolate(from, to, t));
    let target = FixedPointVector2::new(
        x.map_or(to.x, |(_, reflected)| reflected),
        y.map_or(to.y, |(_, reflected)| reflected),
    );

    Some(Reflection {
        contact,
        target,
        flip_x: x.is_some(),
        flip_y: y.is_some(),
    })
}

/// Path fraction at which `from -> to` meets the crossed wall, and the
/// coordinate mirrored back across that wall.
fn axis_crossing(
    from: FixedPoint,
    to: FixedPoint,
    min: FixedPoint,
    max: FixedPoint,
) -> Option<(FixedPoint, FixedPoint)> {
    let wall = if to > max {
        max
    } else if to < min {
        min
    } else {
        return None;
    };

    let travel = to - from;
    let t = if travel.is_zero() {
        FixedPoint::ZERO
    } else {
        ((wall - from) / travel).clamp(FixedPoint::ZERO, FixedPoint::ONE)
    };
    let reflected = (wall + wall - to).clamp(min, max);
    Some((t, reflected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> FixedPointVector2 {
        FixedPointVector2::from_ints(x, y)
    }

    fn square(size: i32) -> Aabb {
        Aabb::from_min_max(p(0, 0), p(size, size))
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = Aabb::from_min_max(p(0, 0), p(4, 4));
        let b = Aabb::from_min_max(p(4, 4), p(6, 6));
        let c = Aabb::from_min_max(p(5, -2), p(7, 3));

        assert!(a.intersects(&b), "shared corner overlaps");
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.contains(p(4, 0)));
        assert!(!a.contains(p(5, 0)));
    }

    #[test]
    fn test_center_and_half_extents() {
        let a = Aabb::from_min_max(p(-2, 2), p(6, 4));
        assert_eq!(a.center(), p(2, 3));
        assert_eq!(a.half_extents(), p(4, 1));
    }

    #[test]
    fn test_step_inside_bounds_is_not_reflected() {
        assert_eq!(reflect_step(&square(10), p(1, 1), p(9, 9)), None);
        assert_eq!(reflect_step(&square(10), p(1, 1), p(10, 0)), None);
    }

    #[test]
    fn test_reflect_off_right_wall() {
        let reflection = reflect_step(&square(10), p(8, 5), p(12, 5)).unwrap();
        assert_eq!(reflection.contact, p(10, 5));
        assert_eq!(reflection.target, p(8, 5));
        assert!(reflection.flip_x);
        assert!(!reflection.flip_y);
    }

    #[test]
    fn test_reflect_off_corner_uses_first_contact() {
        // Hits the floor at t = 1/2 and the left wall at t = 3/4
        let reflection = reflect_step(&square(10), p(3, 2), p(-1, -2)).unwrap();
        assert_eq!(reflection.contact, p(1, 0));
        assert_eq!(reflection.target, p(1, 2));
        assert!(reflection.flip_x);
        assert!(reflection.flip_y);
    }

    #[test]
    fn test_overshoot_larger_than_bounds_is_clamped() {
        let reflection = reflect_step(&square(10), p(5, 5), p(40, 5)).unwrap();
        assert!(square(10).contains(reflection.target));
        assert_eq!(reflection.target, p(0, 5));
    }
}
