use glam::{Vec2, Vec3};

use crate::{
    fixed::{Fixed, float_to_fixed, radians_to_angle},
    view::ViewPoint,
};

/// Largest freelook angle the viewer allows either way (radians).
const MAX_LOOK: f32 = 0.7;

/// Player view-point in world space, in float map units.
///
/// * `z` holds eye height above floor, not absolute altitude.
/// * The renderer only ever sees the fixed-point [`ViewPoint`] made by
///   [`Camera::view_point`].
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pos: Vec3, // x,y in map-units; z = eye height above floor
    yaw: f32,  // radians (0 = east, counter-clockwise)
    pitch: f32, // radians, positive looks down
}

impl Camera {
    /// Create a new camera at `pos`, facing `yaw`.
    pub fn new(pos: Vec3, yaw: f32) -> Self {
        Self {
            pos,
            yaw,
            pitch: 0.0,
        }
    }

    /// World-space eye position: (x, y) = map units, z = eye height above floor.
    #[inline]
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks on the X-Y plane.
    #[inline(always)]
    pub fn forward(self) -> Vec2 {
        let (s, c) = self.yaw.sin_cos();
        Vec2::new(c, s) // 0 rad = +X (east), CCW positive
    }

    /// Unit vector pointing to the camera's right on the X-Y plane.
    #[inline(always)]
    pub fn right(self) -> Vec2 {
        let f = self.forward();
        Vec2::new(f.y, -f.x)
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe), preserving eye-height.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = self.forward();
        let r = self.right();
        self.pos.x += f.x * forward + r.x * side;
        self.pos.y += f.y * forward + r.y * side;
    }

    /// Rotate around Z-axis (positive = turn left).
    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }

    /// Tilt the view; positive looks down.
    pub fn look(&mut self, delta_pitch: f32) {
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_LOOK, MAX_LOOK);
    }

    pub fn center_view(&mut self) {
        self.pitch = 0.0;
    }

    /*─────────────────────── renderer hand-off ──────────────────────*/

    /// Fixed-point snapshot with the eye placed `pos.z` above `floor`.
    pub fn view_point(&self, floor: Fixed) -> ViewPoint {
        ViewPoint {
            x: float_to_fixed(self.pos.x),
            y: float_to_fixed(self.pos.y),
            z: floor.saturating_add(float_to_fixed(self.pos.z)),
            angle: radians_to_angle(self.yaw),
            pitch: radians_to_angle(self.pitch) as i32,
            ..Default::default()
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
