//! Projection tables (rebuilt on resize) and the per-frame view snapshot.

pub mod lights;

use tracing::debug;

use crate::{
    config::RenderConfig,
    error::RenderError,
    fixed::{
        ANG45, ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, fine, finecosine,
        finesine, finetangent, fixed_div, fixed_mul,
    },
};

pub use lights::LightTables;

/// Where the player looks from, as handed over by the game side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewPoint {
    pub x: Fixed,
    pub y: Fixed,
    /// Eye height in world units (absolute, not above the floor).
    pub z: Fixed,
    pub angle: Angle,
    /// Freelook pitch as a signed BAM; positive looks down.
    pub pitch: i32,
    /// Light amplification (gun flashes, light goggles).
    pub extralight: i32,
    /// Force every surface through one colormap (invulnerability, goggles).
    pub fixed_colormap: Option<u8>,
}

/// Immutable for the duration of one frame.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub sin: Fixed,
    pub cos: Fixed,
    pub centerx: i32,
    pub centery: i32,
    pub centerxfrac: Fixed,
    pub centeryfrac: Fixed,
    /// Horizontal focal length; sprite widths.
    pub projection: Fixed,
    /// Vertical focal length (aspect corrected); wall and sprite scale.
    pub projection_y: Fixed,
    pub extralight: i32,
    pub fixed_colormap: Option<u8>,
}

/// Freelook limit, 45° up or down.
const MAX_PITCH: i32 = ANG45 as i32;

/// Screen-geometry tables for one view-window size.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
    pub window_x: i32,
    pub window_y: i32,
    pub centerx: i32,
    pub centerxfrac: Fixed,
    pub yaspectmul: Fixed,
    pub focal_x: Fixed,
    pub focal_y: Fixed,
    /// Half the horizontal FOV as seen from the view centre.
    pub clipangle: Angle,
    /// Fine angle (relative to the view, in `0..FINEANGLES/2`) → column.
    pub viewangletox: Vec<i32>,
    /// Column → smallest view-relative angle projecting onto it.
    pub xtoviewangle: Vec<Angle>,
    /// Column → 1 / cos(view-relative angle), for flats.
    pub distscale: Vec<Fixed>,
    pub lights: LightTables,
    /// Texture step for sky columns.
    pub sky_iscale: Fixed,
    /// Scales a wall or sprite scale to the 320-wide light buckets.
    pub light_norm: Fixed,
    yslope: Vec<Fixed>,
    last_centeryfrac: Option<Fixed>,
}

impl Viewport {
    pub fn new(cfg: &RenderConfig) -> Result<Self, RenderError> {
        cfg.validate()?;

        let width = cfg.view_width as i32;
        let height = cfg.view_height as i32;
        let (wx, wy) = cfg.window_origin();
        let centerx = width / 2;
        let centerxfrac = centerx << FRACBITS;

        let yaspectmul = (65536.0f64 * (320.0 * cfg.screen_height as f64)
            / (200.0 * cfg.screen_width as f64)) as Fixed;

        let fov = cfg.fov;
        let hitan = finetangent(FINEANGLES / 4 + fov / 2);
        let lotan = finetangent(FINEANGLES / 4 - fov / 2);
        let focal_x = fixed_div(centerxfrac, hitan);
        let focal_y = fixed_div(fixed_mul(centerxfrac, yaspectmul), hitan);

        /*──── angle → x, one forward scan ────*/
        let highend = width + 1;
        let viewangletox: Vec<i32> = (0..FINEANGLES / 2)
            .map(|i| {
                let tangent = finetangent(i);
                if tangent > hitan {
                    -1
                } else if tangent < lotan {
                    highend
                } else {
                    let t = (centerxfrac - fixed_mul(tangent, focal_x) + FRACUNIT - 1) >> FRACBITS;
                    t.clamp(-1, highend)
                }
            })
            .collect();

        /*──── x → angle, reverse lookup ────*/
        // viewangletox is non-increasing: walking x right to left, the first
        // index with viewangletox[i] <= x only moves forward
        let mut xtoviewangle = vec![0 as Angle; width as usize + 1];
        let mut i = 0usize;
        for x in (0..=width).rev() {
            while i + 1 < viewangletox.len() && viewangletox[i] > x {
                i += 1;
            }
            xtoviewangle[x as usize] = ((i as u32) << ANGLETOFINESHIFT).wrapping_sub(ANG90);
        }

        /*──── fencepost fix-up ────*/
        let viewangletox: Vec<i32> = viewangletox
            .into_iter()
            .map(|t| match t {
                -1 => 0,
                t if t == highend => t - 1,
                t => t,
            })
            .collect();

        let clipangle = xtoviewangle[0];

        let distscale = xtoviewangle[..width as usize]
            .iter()
            .map(|&a| fixed_div(FRACUNIT, finecosine(fine(a)).abs()))
            .collect();

        let sprite_xscale = centerxfrac / 160;
        let sky_iscale = fixed_div(FRACUNIT, fixed_mul(sprite_xscale, yaspectmul).max(1));
        let light_norm = fixed_div(160 * FRACUNIT, centerxfrac.max(FRACUNIT));

        debug!(
            width,
            height, focal_x, focal_y, clipangle, "viewport tables rebuilt"
        );

        Ok(Self {
            width,
            height,
            window_x: wx as i32,
            window_y: wy as i32,
            centerx,
            centerxfrac,
            yaspectmul,
            focal_x,
            focal_y,
            clipangle,
            viewangletox,
            xtoviewangle,
            distscale,
            lights: LightTables::new(),
            sky_iscale,
            light_norm,
            yslope: vec![0; height as usize],
            last_centeryfrac: None,
        })
    }

    /// Snapshot the view for one frame.
    ///
    /// Rebuilds the row-slope table only when freelook moved the horizon.
    pub fn setup_frame(&mut self, vp: &ViewPoint) -> ViewState {
        let pitch = vp.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        let centeryfrac = if pitch == 0 {
            (self.height / 2) << FRACBITS
        } else {
            let idx = fine((ANG90 as i32).wrapping_sub(pitch) as Angle);
            (self.height << (FRACBITS - 1)) + fixed_mul(self.focal_y, finetangent(idx))
        };

        if self.last_centeryfrac != Some(centeryfrac) {
            self.rebuild_yslope(centeryfrac);
        }

        let fa = fine(vp.angle);
        ViewState {
            x: vp.x,
            y: vp.y,
            z: vp.z,
            angle: vp.angle,
            sin: finesine(fa),
            cos: finecosine(fa),
            centerx: self.centerx,
            centery: centeryfrac >> FRACBITS,
            centerxfrac: self.centerxfrac,
            centeryfrac,
            projection: self.focal_x,
            projection_y: self.focal_y,
            extralight: vp.extralight,
            fixed_colormap: vp.fixed_colormap,
        }
    }

    fn rebuild_yslope(&mut self, centeryfrac: Fixed) {
        for (y, slot) in self.yslope.iter_mut().enumerate() {
            let den = (((y as i32) << FRACBITS) + FRACUNIT / 2 - centeryfrac)
                .abs()
                .max(FRACUNIT / 2);
            *slot = fixed_div(self.focal_y, den);
        }
        self.last_centeryfrac = Some(centeryfrac);
    }

    /// Colormap for a wall or sprite column at projected `scale`. The scale
    /// is brought back to a 320-wide window first, so a shrunk view keeps
    /// the light of the full screen.
    #[inline]
    pub fn scale_light(&self, level: usize, scale: Fixed) -> u8 {
        self.lights.for_scale(level, fixed_mul(scale, self.light_norm))
    }

    /// Row → flat distance per unit of plane height.
    #[inline]
    pub fn yslope(&self) -> &[Fixed] {
        &self.yslope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp320() -> Viewport {
        Viewport::new(&RenderConfig::fullscreen(320, 200)).unwrap()
    }

    #[test]
    fn rejects_bad_config() {
        let err = Viewport::new(&RenderConfig::fullscreen(0, 0)).unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }

    #[test]
    fn classic_320_focal_lengths() {
        let v = vp320();
        assert_eq!(v.centerx, 160);
        assert_eq!(v.yaspectmul, FRACUNIT);
        assert_eq!(v.focal_x, 160 * FRACUNIT);
        assert_eq!(v.focal_y, 160 * FRACUNIT);
    }

    #[test]
    fn xtoviewangle_spans_the_fov() {
        let v = vp320();
        // leftmost column sees +45°, rightmost column about −45°
        assert!(v.clipangle.abs_diff(ANG45) <= 1 << ANGLETOFINESHIFT);
        let last = v.xtoviewangle[v.width as usize];
        assert!(last.wrapping_add(ANG45) <= 1 << ANGLETOFINESHIFT + 1);
        // angles decrease left to right (as signed values)
        for w in v.xtoviewangle.windows(2) {
            assert!((w[1] as i32) <= (w[0] as i32));
        }
    }

    #[test]
    fn viewangletox_is_inverse_of_xtoviewangle() {
        let v = vp320();
        for x in 0..v.width {
            let a = v.xtoviewangle[x as usize].wrapping_add(ANG90);
            let back = v.viewangletox[fine(a)];
            assert!((back - x).abs() <= 1, "x={x} back={back}");
        }
        assert!(v.viewangletox.iter().all(|&x| (0..=v.width).contains(&x)));
    }

    #[test]
    fn wall_light_ignores_the_window_size() {
        use crate::fixed::int_to_fixed;

        let row = 10;
        let cfgs = [
            RenderConfig::fullscreen(320, 200),
            RenderConfig::fullscreen(320, 200).with_blocks(8),
            RenderConfig::fullscreen(320, 200).with_blocks(5),
        ];
        let maps: Vec<Vec<u8>> = cfgs
            .iter()
            .map(|cfg| {
                let v = Viewport::new(cfg).unwrap();
                [100, 150, 200, 300]
                    .iter()
                    .map(|&d| v.scale_light(row, fixed_div(v.focal_y, int_to_fixed(d))))
                    .collect()
            })
            .collect();
        assert_eq!(maps[0], vec![8, 12, 14, 16]);
        assert_eq!(maps[1], maps[0]);
        assert_eq!(maps[2], maps[0]);
    }

    #[test]
    fn distscale_grows_towards_edges() {
        let v = vp320();
        let c = v.distscale[160];
        assert!((c - FRACUNIT).abs() < FRACUNIT / 100);
        assert!(v.distscale[0] > c);
        assert!(v.distscale[319] > c);
    }

    #[test]
    fn frame_snapshot_without_pitch() {
        let mut v = vp320();
        let s = v.setup_frame(&ViewPoint {
            angle: ANG90,
            ..Default::default()
        });
        assert_eq!(s.centery, 100);
        assert_eq!(s.sin, FRACUNIT);
        assert_eq!(s.cos, 0);
        // rows either side of the horizon are mirror images
        assert_eq!(v.yslope()[99], v.yslope()[100]);
        assert!(v.yslope()[100] > v.yslope()[150]);
    }

    #[test]
    fn looking_down_raises_horizon() {
        let mut v = vp320();
        let level = v.setup_frame(&ViewPoint::default());
        let down = v.setup_frame(&ViewPoint {
            pitch: (ANG45 / 4) as i32,
            ..Default::default()
        });
        assert!(down.centery < level.centery);
        // extreme pitch is clamped rather than wrapping
        let clamped = v.setup_frame(&ViewPoint {
            pitch: i32::MAX,
            ..Default::default()
        });
        assert!(clamped.centery < down.centery);
    }
}
