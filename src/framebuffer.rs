//! Pixel storage the drawers write into.
//!
//! A [`FrameBuffer`] is a row-major buffer whose rows may be longer than the
//! visible width (`pitch >= width`). The 3-D view window sits somewhere
//! inside it; [`Canvas`] is the drawers' view of that window, addressed
//! through `ylookup[y] + columnofs[x]`.

use std::fmt::Debug;

use crate::{
    config::{PixelDepth, RenderConfig},
    error::RenderError,
    world::Palette,
};

/// Element type of a framebuffer.
pub trait Pixel: Copy + Default + PartialEq + Debug + 'static {}

/// Paletted.
impl Pixel for u8 {}
/// 0xAARRGGBB.
impl Pixel for u32 {}

#[derive(Clone, Debug)]
pub struct FrameBuffer<P: Pixel> {
    pixels: Vec<P>,
    width: usize,
    height: usize,
    pitch: usize,
    /// Row → element offset of the view window's row start.
    ylookup: Vec<usize>,
    /// Column → element offset of the view window's column.
    columnofs: Vec<usize>,
}

impl<P: Pixel> FrameBuffer<P> {
    /// Buffer with the view window covering the whole surface.
    pub fn new(width: usize, height: usize, pitch: usize) -> Self {
        let pitch = pitch.max(width);
        let mut fb = Self {
            pixels: vec![P::default(); pitch * height],
            width,
            height,
            pitch,
            ylookup: Vec::new(),
            columnofs: Vec::new(),
        };
        fb.set_window(0, 0, width, height);
        fb
    }

    /// Place the view window; it is clipped to the buffer.
    pub fn set_window(&mut self, x: usize, y: usize, w: usize, h: usize) {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        self.ylookup = (0..h).map(|r| (y + r) * self.pitch).collect();
        self.columnofs = (0..w).map(|c| x + c).collect();
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    /// Whole-surface pixel at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<P> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.pitch + x])
    }

    pub fn fill(&mut self, value: P) {
        self.pixels.fill(value);
    }

    /// Drawer view of the view window.
    pub fn canvas(&mut self) -> Canvas<'_, P> {
        Canvas {
            width: self.columnofs.len() as i32,
            height: self.ylookup.len() as i32,
            pitch: self.pitch,
            ylookup: &self.ylookup,
            columnofs: &self.columnofs,
            pixels: &mut self.pixels,
        }
    }
}

/// Mutable view of the 3-D window inside a [`FrameBuffer`].
pub struct Canvas<'a, P: Pixel> {
    pub width: i32,
    pub height: i32,
    pub pitch: usize,
    ylookup: &'a [usize],
    columnofs: &'a [usize],
    pub pixels: &'a mut [P],
}

impl<P: Pixel> Canvas<'_, P> {
    /// Element offset of window pixel `(x, y)`. Both must be inside the window.
    #[inline(always)]
    pub fn offset(&self, x: i32, y: i32) -> usize {
        debug_assert!((0..self.width).contains(&x) && (0..self.height).contains(&y));
        self.ylookup[y as usize] + self.columnofs[x as usize]
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> P {
        self.pixels[self.offset(x, y)]
    }
}

/// A framebuffer at either depth; the depth is fixed by [`RenderConfig`].
#[derive(Clone, Debug)]
pub enum Surface {
    Paletted(FrameBuffer<u8>),
    TrueColor(FrameBuffer<u32>),
}

impl Surface {
    /// Screen-sized surface with the view window placed as configured.
    pub fn new(cfg: &RenderConfig) -> Result<Self, RenderError> {
        cfg.validate()?;
        let (x, y) = cfg.window_origin();
        let (w, h, pitch) = (cfg.screen_width, cfg.screen_height, cfg.pitch());
        Ok(match cfg.depth {
            PixelDepth::Paletted => {
                let mut fb = FrameBuffer::new(w, h, pitch);
                fb.set_window(x, y, cfg.view_width, cfg.view_height);
                Surface::Paletted(fb)
            }
            PixelDepth::TrueColor => {
                let mut fb = FrameBuffer::new(w, h, pitch);
                fb.set_window(x, y, cfg.view_width, cfg.view_height);
                Surface::TrueColor(fb)
            }
        })
    }

    pub fn depth(&self) -> PixelDepth {
        match self {
            Surface::Paletted(_) => PixelDepth::Paletted,
            Surface::TrueColor(_) => PixelDepth::TrueColor,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        match self {
            Surface::Paletted(fb) => (fb.width(), fb.height()),
            Surface::TrueColor(fb) => (fb.width(), fb.height()),
        }
    }

    /// Wipe to palette index 0 / black.
    pub fn clear(&mut self) {
        match self {
            Surface::Paletted(fb) => fb.fill(0),
            Surface::TrueColor(fb) => fb.fill(0xff00_0000),
        }
    }

    /// Copy the visible area out as tightly packed 0xAARRGGBB, for
    /// presenting in a window.
    pub fn to_argb(&self, palette: &Palette, out: &mut Vec<u32>) {
        out.clear();
        match self {
            Surface::Paletted(fb) => {
                for row in fb.pixels.chunks(fb.pitch).take(fb.height) {
                    out.extend(row[..fb.width].iter().map(|&i| palette[i as usize]));
                }
            }
            Surface::TrueColor(fb) => {
                for row in fb.pixels.chunks(fb.pitch).take(fb.height) {
                    out.extend_from_slice(&row[..fb.width]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_offsets_follow_pitch() {
        let mut fb: FrameBuffer<u8> = FrameBuffer::new(8, 6, 10);
        fb.set_window(2, 1, 4, 3);
        let c = fb.canvas();
        assert_eq!((c.width, c.height), (4, 3));
        assert_eq!(c.offset(0, 0), 10 + 2);
        assert_eq!(c.offset(3, 2), 3 * 10 + 5);
    }

    #[test]
    fn window_is_clipped_to_buffer() {
        let mut fb: FrameBuffer<u32> = FrameBuffer::new(8, 6, 8);
        fb.set_window(6, 4, 10, 10);
        let c = fb.canvas();
        assert_eq!((c.width, c.height), (2, 2));
    }

    #[test]
    fn surface_follows_config() {
        let cfg = RenderConfig::fullscreen(320, 200).with_blocks(8);
        let s = Surface::new(&cfg).unwrap();
        assert_eq!(s.depth(), PixelDepth::Paletted);
        assert_eq!(s.size(), (320, 200));

        let cfg = cfg.with_depth(PixelDepth::TrueColor);
        let Surface::TrueColor(mut fb) = Surface::new(&cfg).unwrap() else {
            panic!("wrong depth");
        };
        assert_eq!(fb.canvas().width, 256);
        assert_eq!(fb.canvas().offset(0, 0), 20 * 320 + 32);
    }

    #[test]
    fn argb_export_drops_padding() {
        let mut cfg = RenderConfig::fullscreen(4, 2);
        cfg.pitch_padding = 3;
        let mut s = Surface::new(&cfg).unwrap();
        if let Surface::Paletted(fb) = &mut s {
            fb.pixels_mut()[1] = 7;
        }
        let mut pal = Palette::default();
        pal[7] = 0xff12_3456;
        let mut out = Vec::new();
        s.to_argb(&pal, &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(out[1], 0xff12_3456);
    }
}
