//! 16.16 fixed-point numbers and binary angles.
//!
//! Everything the renderer measures lives in one of two integer types:
//!
//! * [`Fixed`]: signed 16.16, world units and screen scales.
//! * [`Angle`]: unsigned BAM, a full turn is `2^32` so wraparound is free.
//!
//! Trigonometry goes through the lookup tables in [`tables`]; nothing in
//! the per-pixel path touches floating point.

pub mod tables;

pub use tables::{
    finecosine, finesine, finetangent, point_to_angle, point_to_dist, slope_div, tantoangle,
};

/// Signed 16.16 fixed-point value.
pub type Fixed = i32;

/// Binary angle measure (0 … 2^32 == 0 … 360°).
pub type Angle = u32;

pub const FRACBITS: u32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;
pub const ANG270: Angle = 0xc000_0000;

/// Size of the fine sine/cosine tables (one full turn).
pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
/// `Angle >> ANGLETOFINESHIFT` is a fine-table index.
pub const ANGLETOFINESHIFT: u32 = 19;

pub const SLOPERANGE: usize = 2048;
pub const SLOPEBITS: u32 = 11;
pub const DBITS: u32 = FRACBITS - SLOPEBITS;

/// 16.16 multiply through a 64-bit product.
///
/// True overflow of the result wraps silently.
#[inline(always)]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as Fixed
}

/// 16.16 divide through a 64-bit quotient.
///
/// Saturates instead of overflowing: whenever the quotient would not fit
/// (`|a| >> 14 >= |b|`, which covers `b == 0`) the result is `i32::MAX`,
/// or `i32::MIN` when the operands have opposite signs.
#[inline(always)]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
        if (a ^ b) < 0 { i32::MIN } else { i32::MAX }
    } else {
        (((a as i64) << FRACBITS) / b as i64) as Fixed
    }
}

#[inline(always)]
pub const fn int_to_fixed(v: i32) -> Fixed {
    v << FRACBITS
}

/// Truncating conversion toward negative infinity, like `>> FRACBITS`.
#[inline(always)]
pub const fn fixed_to_int(v: Fixed) -> i32 {
    v >> FRACBITS
}

/// Fine-table index for an angle.
#[inline(always)]
pub const fn fine(angle: Angle) -> usize {
    (angle >> ANGLETOFINESHIFT) as usize
}

/// Degrees (as used by map things) to BAM.
pub fn degrees_to_angle(deg: i32) -> Angle {
    (deg.rem_euclid(360) as u64 * (1u64 << 32) / 360) as Angle
}

/// Radians to BAM; only used at the float/fixed boundary (camera, tests).
pub fn radians_to_angle(rad: f32) -> Angle {
    let turns = (rad as f64 / std::f64::consts::TAU).rem_euclid(1.0);
    (turns * 4_294_967_296.0) as u64 as Angle
}

pub fn float_to_fixed(v: f32) -> Fixed {
    (v as f64 * FRACUNIT as f64) as Fixed
}
