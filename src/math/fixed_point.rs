//! Deterministic Q47.16 scalar.
//!
//! `FixedPoint` wraps `fixed::types::I48F16` and fixes the arithmetic policy
//! the simulation relies on. The rounding rules are the crate's:
//!
//! - `*` rounds toward negative infinity.
//! - `/` truncates toward zero.
//! - `round` rounds half away from zero.
//! - `to_int` truncates toward zero.
//! - `sqrt`, `sin` and `cos` read precomputed tables (see [`super::lookup`]).
//!
//! Overflow and division by zero panic in every build profile. The `checked_*`
//! variants return [`MathError`] instead.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use fixed::types::I48F16;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lookup::{self, Operation};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = I48F16::FRAC_NBITS;

/// Mantissa keys keep this many low bits fewer than a raw value.
const KEY_SHIFT: u32 = 4;
const KEY_ROUNDING: i64 = 1 << (KEY_SHIFT - 1);

const NEWTON_STEPS: usize = 2;

/// Errors raised by checked fixed-point operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("fixed-point division by zero")]
    DivisionByZero,
    #[error("square root of negative value {0}")]
    NegativeSqrt(FixedPoint),
    #[error("fixed-point overflow")]
    Overflow,
    #[error("float value is not representable as fixed point")]
    NotRepresentable,
}

/// Deterministic fixed-point number with 16 fractional bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedPoint(I48F16);

impl FixedPoint {
    pub const ZERO: Self = Self(I48F16::ZERO);
    pub const ONE: Self = Self(I48F16::ONE);
    pub const TWO: Self = Self::from_bits(2 << FRAC_BITS);
    pub const HALF: Self = Self::from_bits(1 << (FRAC_BITS - 1));
    pub const NEG_ONE: Self = Self::from_bits(-1 << FRAC_BITS);
    /// Keeps denominators strictly positive where both terms may be zero.
    pub const KLUDGE: Self = Self::from_bits(16);
    /// round(π/2 · 2^16). `PI` and `TAU` are exact multiples of it so that
    /// quadrant boundaries line up.
    pub const HALF_PI: Self = Self::from_bits(102_944);
    pub const PI: Self = Self::from_bits(2 * 102_944);
    pub const TAU: Self = Self::from_bits(4 * 102_944);
    pub const MAX: Self = Self(I48F16::MAX);
    pub const MIN: Self = Self(I48F16::MIN);
    /// Smallest positive value.
    pub const EPSILON: Self = Self(I48F16::DELTA);

    // ========================================================================
    // Construction & Conversion
    // ========================================================================

    #[inline]
    pub const fn from_bits(bits: i64) -> Self {
        Self(I48F16::from_bits(bits))
    }

    #[inline]
    pub const fn to_bits(self) -> i64 {
        self.0.to_bits()
    }

    /// Integer value. Panics if it does not fit the 47 integer bits.
    pub fn from_int(value: i64) -> Self {
        match I48F16::checked_from_num(value) {
            Some(v) => Self(v),
            None => panic!("{}", MathError::Overflow),
        }
    }

    /// `numerator / denominator`, truncated toward zero.
    pub fn from_ratio(numerator: i64, denominator: i64) -> Self {
        Self::from_int(numerator) / Self::from_int(denominator)
    }

    /// Converts a float, rounding to the nearest representable value.
    ///
    /// Only meant for the config boundary; never call this inside a tick.
    pub fn from_f32(value: f32) -> Result<Self, MathError> {
        I48F16::checked_from_num(value).map(Self).ok_or(MathError::NotRepresentable)
    }

    pub fn from_f64(value: f64) -> Result<Self, MathError> {
        I48F16::checked_from_num(value).map(Self).ok_or(MathError::NotRepresentable)
    }

    /// Presentation-only conversion.
    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_num()
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub fn to_int(self) -> i64 {
        self.0.round_to_zero().to_num()
    }

    // ========================================================================
    // Checked Arithmetic
    // ========================================================================

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_neg(self) -> Result<Self, MathError> {
        self.0.checked_neg().map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_mul(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_mul(rhs.0).map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self, MathError> {
        if rhs.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        self.0.checked_div(rhs.0).map(Self).ok_or(MathError::Overflow)
    }

    // ========================================================================
    // Rounding & Sign
    // ========================================================================

    /// Nearest integer-valued number, ties away from zero.
    pub fn round(self) -> Self {
        self.0.checked_round().map(Self).unwrap_or_else(|| panic!("{}", MathError::Overflow))
    }

    /// Largest integer-valued number not greater than `self`.
    pub fn floor(self) -> Self {
        self.0.checked_floor().map(Self).unwrap_or_else(|| panic!("{}", MathError::Overflow))
    }

    /// `ONE`, `NEG_ONE` or `ZERO`.
    pub fn sign(self) -> Self {
        Self(self.0.signum())
    }

    pub fn abs(self) -> Self {
        self.0.checked_abs().map(Self).unwrap_or_else(|| panic!("{}", MathError::Overflow))
    }

    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        Ord::clamp(self, lo, hi)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == I48F16::ZERO
    }

    // ========================================================================
    // Table-Backed Operations
    // ========================================================================

    /// Square root. Panics on negative input.
    pub fn sqrt(self) -> Self {
        self.checked_sqrt().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Square root via the `Sqrt` lookup table.
    ///
    /// The input is normalised by an even power of two into a mantissa in
    /// `[1, 4)`, the mantissa is rounded to the nearest table key, and the
    /// stored root is shifted back by half the exponent. Two Newton steps,
    /// `r = (r + x / r) / 2`, then remove the key quantisation error, which
    /// otherwise grows with the magnitude of the input.
    pub fn checked_sqrt(self) -> Result<Self, MathError> {
        let bits = self.to_bits();
        if bits < 0 {
            return Err(MathError::NegativeSqrt(self));
        }
        if bits == 0 {
            return Ok(Self::ZERO);
        }

        let msb = 63 - bits.leading_zeros() as i32;
        let mut exponent = msb - FRAC_BITS as i32;
        exponent -= exponent.rem_euclid(2);

        let mantissa = if exponent >= 0 {
            bits >> exponent
        } else {
            bits << -exponent
        };
        let key = ((mantissa + KEY_ROUNDING) >> KEY_SHIFT) as i32;
        let root = lookup::table(Operation::Sqrt).lookup(key) as i64;

        let half = exponent / 2;
        let mut estimate = Self::from_bits(if half >= 0 { root << half } else { root >> -half });

        for _ in 0..NEWTON_STEPS {
            let quotient = self.checked_div(estimate)?;
            estimate = estimate.checked_add(quotient)?.checked_div(Self::TWO)?;
        }
        Ok(estimate)
    }

    /// Sine of an angle in radians via the quarter-wave `Sin` table.
    pub fn sin(self) -> Self {
        self.sin_cos().0
    }

    /// Cosine of an angle in radians.
    pub fn cos(self) -> Self {
        self.sin_cos().1
    }

    /// Sine and cosine together.
    ///
    /// The angle is reduced to `[0, TAU)` from its absolute value so that
    /// `sin(-x) == -sin(x)` holds bit for bit.
    pub fn sin_cos(self) -> (Self, Self) {
        let bits = self.to_bits();
        let negative = bits < 0;
        let reduced = (bits.unsigned_abs() % Self::TAU.to_bits() as u64) as i64;
        let half_pi = Self::HALF_PI.to_bits();

        let (quadrant, angle) = match reduced / half_pi {
            0 => (0, reduced),
            1 => (1, reduced - half_pi),
            2 => (2, reduced - 2 * half_pi),
            _ => (3, reduced - 3 * half_pi),
        };

        let s = quarter_sin(angle);
        let c = quarter_sin(half_pi - angle);
        let (s, c) = match quadrant {
            0 => (s, c),
            1 => (c, -s),
            2 => (-s, -c),
            _ => (-c, s),
        };

        if negative {
            (Self::from_bits(-s), Self::from_bits(c))
        } else {
            (Self::from_bits(s), Self::from_bits(c))
        }
    }
}

fn quarter_sin(angle: i64) -> i64 {
    let key = ((angle + KEY_ROUNDING) >> KEY_SHIFT) as i32;
    let table = lookup::table(Operation::Sin);
    let key = key.min(*Operation::Sin.domain().end());
    table.lookup(key) as i64
}

// ============================================================================
// Operators
// ============================================================================

impl Add for FixedPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        self.checked_add(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FixedPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self.checked_sub(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl SubAssign for FixedPoint {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for FixedPoint {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.checked_mul(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Div for FixedPoint {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        self.checked_div(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Neg for FixedPoint {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self.checked_neg().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl From<i32> for FixedPoint {
    fn from(value: i32) -> Self {
        Self(I48F16::from_num(value))
    }
}

impl From<I48F16> for FixedPoint {
    fn from(value: I48F16) -> Self {
        Self(value)
    }
}

impl From<FixedPoint> for I48F16 {
    fn from(value: FixedPoint) -> Self {
        value.0
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(value: f64) -> FixedPoint {
        FixedPoint::from_f64(value).unwrap()
    }

    #[test]
    fn test_same_bits_compare_equal() {
        let a = FixedPoint::from_bits(123_456);
        let b = FixedPoint::from_bits(123_456);
        assert_eq!(a, b);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_mul_rounds_toward_negative_infinity() {
        // 1.5 ulp -> 1 ulp, -1.5 ulp -> -2 ulp
        assert_eq!(fp(1.5) * FixedPoint::EPSILON, FixedPoint::EPSILON);
        assert_eq!(fp(-1.5) * FixedPoint::EPSILON, FixedPoint::from_bits(-2));
        assert_eq!(fp(2.5) * fp(4.0), fp(10.0));
    }

    #[test]
    fn test_matches_i48f16_bit_for_bit() {
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..1_000 {
            let a = rng.i64(-(1i64 << 40)..(1i64 << 40));
            let b = rng.i64(1..(1i64 << 24));
            let (fa, fb) = (I48F16::from_bits(a), I48F16::from_bits(b));
            let (xa, xb) = (FixedPoint::from_bits(a), FixedPoint::from_bits(b));
            assert_eq!((xa * xb).to_bits(), (fa * fb).to_bits());
            assert_eq!((xa / xb).to_bits(), (fa / fb).to_bits());
            assert_eq!(xa.round().to_bits(), fa.round().to_bits());
        }
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        let third = FixedPoint::ONE / FixedPoint::from_int(3);
        assert_eq!(third.to_bits(), 21_845);
        let neg_third = FixedPoint::NEG_ONE / FixedPoint::from_int(3);
        assert_eq!(neg_third.to_bits(), -21_845);
    }

    #[test]
    fn test_checked_div_by_zero_is_error() {
        assert_eq!(
            FixedPoint::ONE.checked_div(FixedPoint::ZERO),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_div_by_zero_panics() {
        let _ = FixedPoint::ONE / FixedPoint::ZERO;
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(FixedPoint::MAX.checked_add(FixedPoint::EPSILON), Err(MathError::Overflow));
        assert_eq!(FixedPoint::MAX.checked_mul(FixedPoint::TWO), Err(MathError::Overflow));
    }

    #[test]
    fn test_sign() {
        assert_eq!(fp(3.25).sign(), FixedPoint::ONE);
        assert_eq!(fp(-0.001).sign(), FixedPoint::NEG_ONE);
        assert_eq!(FixedPoint::ZERO.sign(), FixedPoint::ZERO);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(fp(2.5).round(), fp(3.0));
        assert_eq!(fp(-2.5).round(), fp(-3.0));
        assert_eq!(fp(2.499).round(), fp(2.0));
        assert_eq!(fp(-0.4).round(), FixedPoint::ZERO);
    }

    #[test]
    fn test_to_int_truncates() {
        assert_eq!(fp(7.9).to_int(), 7);
        assert_eq!(fp(-7.9).to_int(), -7);
        assert_eq!(fp(-7.9).floor(), fp(-8.0));
    }

    #[test]
    fn test_sqrt_perfect_squares_are_exact() {
        for n in [1i64, 4, 9, 16, 25, 100, 144, 1024, 65_536] {
            let root = FixedPoint::from_int(n).sqrt();
            let expected = FixedPoint::from_int((n as f64).sqrt() as i64);
            assert_eq!(root, expected, "sqrt({n})");
        }
        assert_eq!(fp(0.25).sqrt(), FixedPoint::HALF);
        assert_eq!(FixedPoint::ZERO.sqrt(), FixedPoint::ZERO);
    }

    #[test]
    fn test_sqrt_is_close_to_reference() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..2_000 {
            let bits = rng.i64(1..(1i64 << 40));
            let value = FixedPoint::from_bits(bits);
            let reference = value.to_f64().sqrt();
            let got = value.sqrt().to_f64();
            let tolerance = reference * 2e-4 + 2.0 / 65_536.0;
            assert!((got - reference).abs() <= tolerance, "sqrt({value}) = {got}, expected {reference}");
        }
    }

    #[test]
    fn test_sqrt_of_large_squares_is_within_one_ulp() {
        for n in [12_345i64, 46_341, 999_999, 3_000_000] {
            let root = FixedPoint::from_int(n * n).sqrt();
            let error = (root - FixedPoint::from_int(n)).abs();
            assert!(error <= FixedPoint::EPSILON, "sqrt({n}^2) = {root}");
        }
    }

    #[test]
    fn test_sqrt_negative() {
        let value = fp(-4.0);
        assert_eq!(value.checked_sqrt(), Err(MathError::NegativeSqrt(value)));
    }

    #[test]
    fn test_sin_cos_key_angles() {
        assert_eq!(FixedPoint::ZERO.sin(), FixedPoint::ZERO);
        assert_eq!(FixedPoint::ZERO.cos(), FixedPoint::ONE);
        assert_eq!(FixedPoint::HALF_PI.sin(), FixedPoint::ONE);
        assert_eq!(FixedPoint::PI.cos(), FixedPoint::NEG_ONE);
    }

    #[test]
    fn test_sin_is_odd_bit_for_bit() {
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..500 {
            let angle = FixedPoint::from_bits(rng.i64(0..4_000_000));
            assert_eq!((-angle).sin(), -angle.sin());
            assert_eq!((-angle).cos(), angle.cos());
        }
    }

    #[test]
    fn test_sin_tracks_reference() {
        for step in 0..400 {
            let angle = FixedPoint::from_ratio(step, 25);
            let reference = angle.to_f64().sin();
            let got = angle.sin().to_f64();
            assert!((got - reference).abs() < 2e-3, "sin({angle}) = {got}, expected {reference}");
        }
    }

    #[test]
    fn test_float_boundary() {
        assert_eq!(FixedPoint::from_f32(1.5).unwrap(), FixedPoint::from_bits(98_304));
        assert_eq!(FixedPoint::from_f32(f32::NAN), Err(MathError::NotRepresentable));
        assert_eq!(fp(-3.75).to_f32(), -3.75);
    }

    #[test]
    fn test_display_is_exact_decimal() {
        assert_eq!(fp(2.5).to_string(), "2.5");
        assert_eq!(fp(-0.25).to_string(), "-0.25");
    }
}
