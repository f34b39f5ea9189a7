//! Column and span rasterizers.
//!
//! Every drawer takes its parameters in an explicit context struct and
//! writes into a [`Canvas`]. The pixel depth is resolved once per call by
//! [`DrawTarget`]; the per-pixel loops are monomorphic.

mod column;
mod fuzz;
mod span;

pub use column::draw_column;
pub use fuzz::{FUZZTABLE, FuzzState};
pub use span::draw_span;

use crate::{
    fixed::Fixed,
    framebuffer::{Canvas, Pixel, Surface},
    view::lights::FUZZ_COLORMAP,
    world::{BlendTable, Colormaps, Palette, TextureBank},
};

/// Closed set of column drawers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Textured, through the light colormap.
    Plain,
    /// Textured, no light (sky).
    Stretch,
    /// One flat colour.
    Fill,
    /// Spectre shimmer: darkened copies of neighbouring pixels.
    Fuzz,
    Translucent,
    Translated,
    TranslatedTranslucent,
}

/// Parameters for one vertical run of pixels.
#[derive(Clone, Copy, Debug)]
pub struct ColumnDrawContext<'a> {
    pub x: i32,
    /// First and last row, inclusive.
    pub yl: i32,
    pub yh: i32,
    /// Texture rows per screen row.
    pub iscale: Fixed,
    /// Texture row at the horizon line.
    pub texturemid: Fixed,
    pub centery: i32,
    pub source: &'a [u8],
    /// `source.len() - 1`, a power of two minus one.
    pub mask: i32,
    pub colormap: &'a [u8; 256],
    pub translation: Option<&'a [u8; 256]>,
    /// Palette index for [`ColumnKind::Fill`].
    pub color: u8,
}

/// Parameters for one horizontal run across a flat.
#[derive(Clone, Copy, Debug)]
pub struct SpanDrawContext<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    pub source: &'a [u8],
    pub colormap: &'a [u8; 256],
}

/// Colour tables the drawers need beyond the per-call colormap.
#[derive(Clone, Copy)]
pub struct DrawTables<'a> {
    pub palette: &'a Palette,
    pub colormaps: &'a Colormaps,
    pub blend: &'a BlendTable,
}

impl<'a> DrawTables<'a> {
    pub fn from_bank(bank: &'a TextureBank) -> Self {
        Self {
            palette: bank.palette(),
            colormaps: bank.colormaps(),
            blend: bank.blend(),
        }
    }
}

/// How a palette index becomes a pixel of a given depth.
pub trait Shade: Pixel {
    fn from_index(idx: u8, t: &DrawTables) -> Self;
    /// 50 % mix of `dst` with palette colour `idx`.
    fn blend(dst: Self, idx: u8, t: &DrawTables) -> Self;
    /// Darkened copy of `src`, for fuzz.
    fn darken(src: Self, t: &DrawTables) -> Self;
}

impl Shade for u8 {
    #[inline(always)]
    fn from_index(idx: u8, _: &DrawTables) -> Self {
        idx
    }
    #[inline(always)]
    fn blend(dst: Self, idx: u8, t: &DrawTables) -> Self {
        t.blend.mix(dst, idx)
    }
    #[inline(always)]
    fn darken(src: Self, t: &DrawTables) -> Self {
        t.colormaps[FUZZ_COLORMAP as usize][src as usize]
    }
}

impl Shade for u32 {
    #[inline(always)]
    fn from_index(idx: u8, t: &DrawTables) -> Self {
        t.palette[idx as usize]
    }
    #[inline(always)]
    fn blend(dst: Self, idx: u8, t: &DrawTables) -> Self {
        let src = t.palette[idx as usize];
        ((dst >> 1) & 0x7f7f_7f7f) + ((src >> 1) & 0x7f7f_7f7f)
    }
    #[inline(always)]
    fn darken(src: Self, _: &DrawTables) -> Self {
        // three quarters of each channel
        (((src >> 2) & 0x003f_3f3f) * 3) | 0xff00_0000
    }
}

/// The view window of a [`Surface`], borrowed for one frame.
pub enum DrawTarget<'a> {
    Paletted(Canvas<'a, u8>),
    TrueColor(Canvas<'a, u32>),
}

impl Surface {
    pub fn target(&mut self) -> DrawTarget<'_> {
        match self {
            Surface::Paletted(fb) => DrawTarget::Paletted(fb.canvas()),
            Surface::TrueColor(fb) => DrawTarget::TrueColor(fb.canvas()),
        }
    }
}

impl DrawTarget<'_> {
    pub fn width(&self) -> i32 {
        match self {
            DrawTarget::Paletted(c) => c.width,
            DrawTarget::TrueColor(c) => c.width,
        }
    }

    pub fn height(&self) -> i32 {
        match self {
            DrawTarget::Paletted(c) => c.height,
            DrawTarget::TrueColor(c) => c.height,
        }
    }

    #[inline]
    pub fn column(
        &mut self,
        dc: &ColumnDrawContext,
        kind: ColumnKind,
        t: &DrawTables,
        fuzz: &mut FuzzState,
    ) {
        match self {
            DrawTarget::Paletted(c) => draw_column(c, dc, kind, t, fuzz),
            DrawTarget::TrueColor(c) => draw_column(c, dc, kind, t, fuzz),
        }
    }

    #[inline]
    pub fn span(&mut self, ds: &SpanDrawContext, t: &DrawTables) {
        match self {
            DrawTarget::Paletted(c) => draw_span(c, ds, t),
            DrawTarget::TrueColor(c) => draw_span(c, ds, t),
        }
    }
}
