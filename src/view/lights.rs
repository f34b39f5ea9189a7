//! Banded light: sector level × distance bucket → colormap index.

use crate::fixed::{FRACUNIT, Fixed, fixed_div};

pub const LIGHTLEVELS: usize = 16;
/// Sector light (0‥255) to light-level row.
pub const LIGHTSEGSHIFT: u32 = 4;
pub const MAXLIGHTSCALE: usize = 48;
pub const LIGHTSCALESHIFT: u32 = 12;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: u32 = 20;
/// Number of diminishing-light colormaps (the table set holds more).
pub const NUMCOLORMAPS: usize = 32;
const DISTMAP: i32 = 2;

/// Colormap index used by the spectre fuzz.
pub const FUZZ_COLORMAP: u8 = 6;

/// Per-viewport light tables; indices into the colormap set.
#[derive(Clone, Debug)]
pub struct LightTables {
    /// Walls and sprites, bucketed by projected scale.
    pub scalelight: [[u8; MAXLIGHTSCALE]; LIGHTLEVELS],
    /// Flats, bucketed by distance.
    pub zlight: [[u8; MAXLIGHTZ]; LIGHTLEVELS],
}

#[inline]
fn clamp_map(level: i32) -> u8 {
    level.clamp(0, NUMCOLORMAPS as i32 - 1) as u8
}

#[inline]
fn start_map(i: usize) -> i32 {
    (((LIGHTLEVELS - 1 - i) * 2 * NUMCOLORMAPS) / LIGHTLEVELS) as i32
}

impl LightTables {
    /// Scale buckets assume a 160-column half width; callers normalise
    /// the projected scale to that before indexing `scalelight`.
    pub fn new() -> Self {
        let mut scalelight = [[0u8; MAXLIGHTSCALE]; LIGHTLEVELS];
        let mut zlight = [[0u8; MAXLIGHTZ]; LIGHTLEVELS];

        for i in 0..LIGHTLEVELS {
            let startmap = start_map(i);

            for (j, slot) in scalelight[i].iter_mut().enumerate() {
                *slot = clamp_map(startmap - j as i32 / DISTMAP);
            }

            for (j, slot) in zlight[i].iter_mut().enumerate() {
                let scale: Fixed = fixed_div(160 * FRACUNIT, ((j + 1) as i32) << LIGHTZSHIFT);
                let scale = scale >> LIGHTSCALESHIFT;
                *slot = clamp_map(startmap - scale / DISTMAP);
            }
        }

        Self { scalelight, zlight }
    }

    /// Colormap for a wall or sprite at a 320-wide-normalised `scale`.
    #[inline]
    pub fn for_scale(&self, level: usize, scale: Fixed) -> u8 {
        let idx = ((scale >> LIGHTSCALESHIFT).max(0) as usize).min(MAXLIGHTSCALE - 1);
        self.scalelight[level][idx]
    }

    /// Row for a sector light level plus the view's extra light.
    #[inline]
    pub fn level(sector_light: i16, extralight: i32) -> usize {
        ((sector_light as i32 >> LIGHTSEGSHIFT) + extralight).clamp(0, LIGHTLEVELS as i32 - 1)
            as usize
    }
}

impl Default for LightTables {
    fn default() -> Self {
        Self::new()
    }
}
