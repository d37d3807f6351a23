use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::FixedPoint;

/// Immutable 2D vector over [`FixedPoint`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedPointVector2 {
    pub x: FixedPoint,
    pub y: FixedPoint,
}

impl FixedPointVector2 {
    pub const ZERO: Self = Self::new(FixedPoint::ZERO, FixedPoint::ZERO);
    pub const ONE: Self = Self::new(FixedPoint::ONE, FixedPoint::ONE);
    pub const NEG_ONE: Self = Self::new(FixedPoint::NEG_ONE, FixedPoint::NEG_ONE);
    pub const UP: Self = Self::new(FixedPoint::ZERO, FixedPoint::ONE);
    pub const DOWN: Self = Self::new(FixedPoint::ZERO, FixedPoint::NEG_ONE);
    pub const LEFT: Self = Self::new(FixedPoint::NEG_ONE, FixedPoint::ZERO);
    pub const RIGHT: Self = Self::new(FixedPoint::ONE, FixedPoint::ZERO);

    pub const fn new(x: FixedPoint, y: FixedPoint) -> Self {
        Self { x, y }
    }

    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(FixedPoint::from(x), FixedPoint::from(y))
    }

    /// `a * (1 - t) + b * t`. `t` is not clamped.
    pub fn interpolate(a: Self, b: Self, t: FixedPoint) -> Self {
        let s = FixedPoint::ONE - t;
        Self::new(a.x * s + b.x * t, a.y * s + b.y * t)
    }

    pub fn dot(a: Self, b: Self) -> FixedPoint {
        a.x * b.x + a.y * b.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(a: Self, b: Self) -> FixedPoint {
        a.x * b.y - a.y * b.x
    }

    pub fn distance(a: Self, b: Self) -> FixedPoint {
        (a - b).magnitude()
    }

    pub fn sqr_magnitude(self) -> FixedPoint {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(self) -> FixedPoint {
        self.sqr_magnitude().sqrt()
    }

    /// Magnitude limited to at most `max`.
    pub fn clamp_magnitude(self, max: FixedPoint) -> FixedPoint {
        self.magnitude().min(max)
    }

    /// Unit vector in the same direction.
    ///
    /// A zero magnitude (including vectors too short to square into a
    /// non-zero value) falls back to the componentwise sign.
    pub fn normalize(self) -> Self {
        let magnitude = self.magnitude();
        if magnitude.is_zero() {
            return self.sign();
        }
        self / magnitude
    }

    /// Divides by the magnitude after clamping it to at most `clamp`. Returns
    /// `self` unchanged when the clamped magnitude is not positive.
    pub fn normalize_with_clamped_magnitude(self, clamp: FixedPoint) -> Self {
        let magnitude = self.clamp_magnitude(clamp);
        if magnitude > FixedPoint::ZERO {
            return self / magnitude;
        }
        self
    }

    pub fn sign(self) -> Self {
        Self::new(self.x.sign(), self.y.sign())
    }

    pub fn to_f32(self) -> (f32, f32) {
        (self.x.to_f32(), self.y.to_f32())
    }

    /// Rounded integer coordinates for the renderer.
    pub fn to_draw_point(self) -> (i32, i32) {
        (to_draw_coord(self.x), to_draw_coord(self.y))
    }
}

/// Rounds half away from zero and saturates into `i32`.
pub fn to_draw_coord(value: FixedPoint) -> i32 {
    let rounded = value.round().to_int();
    rounded.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl Add for FixedPointVector2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Add<FixedPoint> for FixedPointVector2 {
    type Output = Self;
    fn add(self, rhs: FixedPoint) -> Self::Output {
        Self::new(self.x + rhs, self.y + rhs)
    }
}

impl Sub for FixedPointVector2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Sub<FixedPoint> for FixedPointVector2 {
    type Output = Self;
    fn sub(self, rhs: FixedPoint) -> Self::Output {
        Self::new(self.x - rhs, self.y - rhs)
    }
}

impl Mul for FixedPointVector2 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<FixedPoint> for FixedPointVector2 {
    type Output = Self;
    fn mul(self, rhs: FixedPoint) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<FixedPointVector2> for FixedPoint {
    type Output = FixedPointVector2;
    fn mul(self, rhs: FixedPointVector2) -> Self::Output {
        rhs * self
    }
}

impl Div for FixedPointVector2 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl Div<FixedPoint> for FixedPointVector2 {
    type Output = Self;
    fn div(self, rhs: FixedPoint) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for FixedPointVector2 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Display for FixedPointVector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
