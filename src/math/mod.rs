//! Deterministic fixed-point mathematics.
//!
//! All simulation math goes through [`FixedPoint`] and [`FixedPointVector2`]
//! so results are bit-identical on every platform. Irrational functions read
//! build-once tables from [`lookup`] instead of calling float routines.

mod fixed_point;
pub mod lookup;
mod vector2;

pub use fixed_point::{FixedPoint, MathError, FRAC_BITS};
pub use vector2::{to_draw_coord, FixedPointVector2};
