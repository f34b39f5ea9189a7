//! Screen and view-window configuration.
//!
//! A [`RenderConfig`] is checked once by [`RenderConfig::validate`]; every
//! table the renderer builds afterwards assumes the values are sane.

use crate::error::RenderError;

/// Pixel depth of the target framebuffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelDepth {
    /// 8-bit palette indices; remapping through colormaps only.
    #[default]
    Paletted,
    /// 0xAARRGGBB; palette lookup happens in the drawers.
    TrueColor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub screen_width: usize,
    pub screen_height: usize,
    /// Size of the 3-D view window, centred inside the screen.
    pub view_width: usize,
    pub view_height: usize,
    /// Extra elements per framebuffer row beyond `screen_width`.
    pub pitch_padding: usize,
    /// Horizontal field of view in fine angles (2048 == 90°).
    pub fov: usize,
    pub depth: PixelDepth,
}

/// Narrowest and widest field of view the tangent table can express.
pub const MIN_FOV: usize = 64;
pub const MAX_FOV: usize = 3584;

/// Renderer-wide limit; per-column clip arrays are `i16`.
pub const MAX_DIMENSION: usize = 8192;

impl Default for RenderConfig {
    fn default() -> Self {
        Self::fullscreen(640, 400)
    }
}

impl RenderConfig {
    /// View window covering the whole screen.
    pub fn fullscreen(width: usize, height: usize) -> Self {
        Self {
            screen_width: width,
            screen_height: height,
            view_width: width,
            view_height: height,
            pitch_padding: 0,
            fov: 2048,
            depth: PixelDepth::Paletted,
        }
    }

    /// Shrink the view window to `blocks/10` of the screen, like the
    /// classic `screenblocks` setting (`blocks` in `3..=11`).
    pub fn with_blocks(mut self, blocks: usize) -> Self {
        let blocks = blocks.clamp(3, 11);
        if blocks >= 10 {
            self.view_width = self.screen_width;
            self.view_height = self.screen_height;
        } else {
            self.view_width = (blocks * self.screen_width / 10) & !7;
            self.view_height = (blocks * self.screen_height / 10) & !7;
        }
        self
    }

    pub fn with_depth(mut self, depth: PixelDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn pitch(&self) -> usize {
        self.screen_width + self.pitch_padding
    }

    /// Top-left corner of the view window inside the screen.
    pub fn window_origin(&self) -> (usize, usize) {
        (
            (self.screen_width - self.view_width) / 2,
            (self.screen_height - self.view_height) / 2,
        )
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        let bad = |msg: String| Err(RenderError::Config(msg));

        if self.screen_width == 0 || self.screen_height == 0 {
            return bad(format!(
                "screen {}x{} has a zero dimension",
                self.screen_width, self.screen_height
            ));
        }
        if self.view_width < 2 || self.view_height < 2 {
            return bad(format!(
                "view window {}x{} is too small",
                self.view_width, self.view_height
            ));
        }
        if self.view_width > self.screen_width || self.view_height > self.screen_height {
            return bad(format!(
                "view window {}x{} exceeds screen {}x{}",
                self.view_width, self.view_height, self.screen_width, self.screen_height
            ));
        }
        if self.screen_width > MAX_DIMENSION || self.screen_height > MAX_DIMENSION {
            return bad(format!("screen dimension above {MAX_DIMENSION}"));
        }
        if !(MIN_FOV..=MAX_FOV).contains(&self.fov) {
            return bad(format!(
                "fov {} outside {MIN_FOV}..={MAX_FOV} fine angles",
                self.fov
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sizes_rejected() {
        let cfg = RenderConfig::fullscreen(0, 200);
        assert!(matches!(cfg.validate(), Err(RenderError::Config(_))));

        let mut cfg = RenderConfig::fullscreen(320, 200);
        cfg.view_height = 0;
        assert!(matches!(cfg.validate(), Err(RenderError::Config(_))));
    }

    #[test]
    fn oversized_window_rejected() {
        let mut cfg = RenderConfig::fullscreen(320, 200);
        cfg.view_width = 400;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fov_range_checked() {
        let mut cfg = RenderConfig::fullscreen(320, 200);
        cfg.fov = 4096;
        assert!(cfg.validate().is_err());
        cfg.fov = 1024;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blocks_shrink_and_centre_window() {
        let cfg = RenderConfig::fullscreen(320, 200).with_blocks(8);
        assert_eq!((cfg.view_width, cfg.view_height), (256, 160));
        assert_eq!(cfg.window_origin(), (32, 20));
        assert!(cfg.validate().is_ok());
    }
}
