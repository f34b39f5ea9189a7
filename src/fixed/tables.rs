//! Angle lookup tables and the table-driven `point_to_angle`.
//!
//! The tables are generated once, on first use, and never change after.
//! Values match the classic generator bit for bit: cardinal directions
//! are exact (`sin 90° == FRACUNIT`), tangents are rounded half-up.

use once_cell::sync::Lazy;
use std::f64::consts::PI;

use super::{
    ANG45, ANG90, ANG180, ANG270, ANGLETOFINESHIFT, Angle, DBITS, FINEANGLES, FRACUNIT, Fixed,
    SLOPERANGE, fixed_div,
};

/* 5/4 of a turn so that cosine is a plain offset into the same table */
static FINESINE: Lazy<Box<[Fixed]>> = Lazy::new(|| {
    let pimul = PI * 2.0 / FINEANGLES as f64;
    let q = FINEANGLES / 4;
    let mut t = vec![0 as Fixed; 5 * FINEANGLES / 4];

    for i in 0..q {
        t[i] = (FRACUNIT as f64 * (i as f64 * pimul).sin()) as Fixed;
    }
    for i in 0..q {
        t[i + q] = t[q - 1 - i];
    }
    for i in 0..FINEANGLES / 2 {
        t[i + FINEANGLES / 2] = -t[i];
    }
    t[q] = FRACUNIT;
    t[3 * q] = -FRACUNIT;
    t.copy_within(0..q, FINEANGLES);
    t.into_boxed_slice()
});

static FINETANGENT: Lazy<Box<[Fixed]>> = Lazy::new(|| {
    let pimul = PI * 2.0 / FINEANGLES as f64;
    let q = (FINEANGLES / 4) as f64;
    (0..FINEANGLES / 2)
        .map(|i| {
            // index 0 would be tan(-90°); nudge it half a step
            let a = if i == 0 { 0.5 - q } else { i as f64 - q };
            (FRACUNIT as f64 * (a * pimul).tan() + 0.5) as Fixed
        })
        .collect()
});

static TANTOANGLE: Lazy<Box<[Angle]>> = Lazy::new(|| {
    (0..=SLOPERANGE)
        .map(|i| {
            let f = (i as f64).atan2(SLOPERANGE as f64) / 6.283_185_307_18;
            (0xffff_ffffu32 as f64 * f) as Angle
        })
        .collect()
});

/// `sin` of fine angle `i`; valid for `i < 5*FINEANGLES/4`.
#[inline(always)]
pub fn finesine(i: usize) -> Fixed {
    FINESINE[i]
}

/// `cos` of fine angle `i`; valid for `i < FINEANGLES`.
#[inline(always)]
pub fn finecosine(i: usize) -> Fixed {
    FINESINE[i + FINEANGLES / 4]
}

/// Tangent of `(i - FINEANGLES/4)` fine steps; valid for `i < FINEANGLES/2`.
#[inline(always)]
pub fn finetangent(i: usize) -> Fixed {
    FINETANGENT[i]
}

#[inline(always)]
pub fn tantoangle(i: usize) -> Angle {
    TANTOANGLE[i]
}

/// Slope `num/den` (both non-negative, `num <= den`) to an angle in the
/// first octant.
pub fn slope_div(num: u32, den: u32) -> Angle {
    if den < 512 {
        return ANG45 - 1;
    }
    let ans = (num << 3) / (den >> 8);
    if ans as usize <= SLOPERANGE {
        tantoangle(ans as usize)
    } else {
        ANG45 - 1
    }
}

/// Angle of the vector `(dx, dy)` by octant folding and the tangent table.
///
/// `(0, 0)` maps to 0. Coordinates beyond ±`i32::MAX/4` would overflow the
/// slope computation and fall back to `atan2`.
pub fn point_to_angle(x: Fixed, y: Fixed) -> Angle {
    if (x | y) == 0 {
        return 0;
    }

    const LIM: i32 = i32::MAX / 4;
    if !(x < LIM && x > -LIM && y < LIM && y > -LIM) {
        let rad = (y as f64).atan2(x as f64);
        return (rad * (ANG180 as f64 / PI)).round() as i64 as Angle;
    }

    let (ax, ay) = (x.unsigned_abs(), y.unsigned_abs());
    match (x >= 0, y >= 0) {
        (true, true) => {
            if ax > ay {
                slope_div(ay, ax)
            } else {
                ANG90 - 1 - slope_div(ax, ay)
            }
        }
        (true, false) => {
            if ax > ay {
                0u32.wrapping_sub(slope_div(ay, ax))
            } else {
                ANG270 + slope_div(ax, ay)
            }
        }
        (false, true) => {
            if ax > ay {
                ANG180 - 1 - slope_div(ay, ax)
            } else {
                ANG90 + slope_div(ax, ay)
            }
        }
        (false, false) => {
            if ax > ay {
                ANG180 + slope_div(ay, ax)
            } else {
                ANG270 - 1 - slope_div(ax, ay)
            }
        }
    }
}

/// Length of `(dx, dy)` without a square root.
pub fn point_to_dist(dx: Fixed, dy: Fixed) -> Fixed {
    let mut dx = dx.wrapping_abs();
    let mut dy = dy.wrapping_abs();
    if (dx | dy) == 0 {
        return 0;
    }
    if dy > dx {
        std::mem::swap(&mut dx, &mut dy);
    }
    let slope = (fixed_div(dy, dx) >> DBITS) as usize;
    let angle = tantoangle(slope.min(SLOPERANGE)) >> ANGLETOFINESHIFT;
    fixed_div(dx, finecosine(angle as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{FINEMASK, fixed_mul};
    use proptest::prelude::*;

    #[test]
    fn cardinal_directions_are_exact() {
        assert_eq!(finesine(0), 0);
        assert_eq!(finesine(FINEANGLES / 4), FRACUNIT);
        assert_eq!(finesine(3 * FINEANGLES / 4), -FRACUNIT);
        assert_eq!(finecosine(0), FRACUNIT);
        assert_eq!(finecosine(FINEANGLES / 2), -FRACUNIT);
    }

    #[test]
    fn tangent_table_is_monotonic() {
        for i in 1..FINEANGLES / 2 {
            assert!(finetangent(i) >= finetangent(i - 1), "dip at {i}");
        }
        assert_eq!(finetangent(FINEANGLES / 4), 0);
        assert_eq!(finetangent(FINEANGLES / 4 + 1024), FRACUNIT);
    }

    #[test]
    fn tantoangle_spans_an_octant() {
        assert_eq!(tantoangle(0), 0);
        let top = tantoangle(SLOPERANGE);
        assert!(ANG45 - top < 4, "45° entry off by {}", ANG45 - top);
    }

    #[test]
    fn axes_map_to_quadrant_angles() {
        let r = 64 * FRACUNIT;
        assert_eq!(point_to_angle(r, 0), 0);
        assert_eq!(point_to_angle(0, 0), 0);
        assert!(point_to_angle(0, r).abs_diff(ANG90) <= 1);
        assert!(point_to_angle(-r, 0).abs_diff(ANG180) <= 1);
        assert!(point_to_angle(0, -r).abs_diff(ANG270) <= 1);
    }

    #[test]
    fn huge_coordinates_use_float_path() {
        let a = point_to_angle(i32::MAX / 2, i32::MAX / 2);
        assert!(a.abs_diff(ANG45) < 1 << 12);
    }

    #[test]
    fn dist_of_axis_vectors() {
        assert_eq!(point_to_dist(0, 0), 0);
        let d = point_to_dist(100 * FRACUNIT, 0);
        assert!((d - 100 * FRACUNIT).abs() <= 2);
        let d = point_to_dist(30 * FRACUNIT, 40 * FRACUNIT);
        assert!((d - 50 * FRACUNIT).abs() < FRACUNIT / 8, "3-4-5 gave {d}");
    }

    proptest! {
        #[test]
        fn angle_survives_sin_cos_round_trip(i in 0usize..FINEANGLES) {
            let radius = 1024 * FRACUNIT;
            let x = fixed_mul(finecosine(i), radius);
            let y = fixed_mul(finesine(i & FINEMASK), radius);
            let expect = (i as u32) << ANGLETOFINESHIFT;
            let got = point_to_angle(x, y);
            // signed wrap-aware difference
            let diff = got.wrapping_sub(expect) as i32;
            // slope quantisation in the octant lookup is coarsest near fine
            // index 1200..1260, about 1.06 fine steps off
            prop_assert!(diff.unsigned_abs() <= 0x9_0000, "i={i} got={got:#x} want={expect:#x}");
        }
    }
}
