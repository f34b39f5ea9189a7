//! Rendering abstraction layer.
//!
//! *The viewer never touches a pixel buffer directly.* It hands a view, a
//! level and a texture bank to a type implementing [`Renderer`] and gets
//! the finished frame back through a closure.
//!
//! * [`software::Software`] is the classic BSP renderer; it draws into a
//!   caller-owned [`Surface`].
//! * [`SoftwareRenderer`] owns that surface and converts it to ARGB for
//!   presenting.
//! * A blanket impl [`RendererExt`] adds `draw_frame` so call-sites stay
//!   short.

use crate::{
    config::RenderConfig,
    error::RenderError,
    framebuffer::Surface,
    view::ViewPoint,
    world::{Level, Palette, TextureBank},
};

pub mod software;

use software::{FrameStats, Software};

/// Pixel format handed to `submit` (0xAARRGGBB).
pub type Rgba = u32;

/// A renderer that owns an internal frame for the whole frame.
///
/// `end_frame` hands the finished buffer to a user-supplied closure.
pub trait Renderer {
    /// Clear the frame, including any border around a shrunk view window.
    fn begin_frame(&mut self);

    /// Draw the 3-D view into the internal frame.
    fn render_view(
        &mut self,
        view: &ViewPoint,
        level: &Level,
        bank: &TextureBank,
    ) -> Result<FrameStats, RenderError>;

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * A windowed caller passes
    ///   `|fb, w, h| window.update_with_buffer(fb, w, h)`.
    fn end_frame<F>(&mut self, palette: &Palette, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize);
}

/// Convenience blanket-impl with a one-liner `draw_frame` adaptor.
pub trait RendererExt: Renderer {
    fn draw_frame<F>(
        &mut self,
        view: &ViewPoint,
        level: &Level,
        bank: &TextureBank,
        submit: F,
    ) -> Result<FrameStats, RenderError>
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.begin_frame();
        let stats = self.render_view(view, level, bank)?;
        self.end_frame(bank.palette(), submit);
        Ok(stats)
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

/// [`Software`] plus the surface it draws into.
pub struct SoftwareRenderer {
    backend: Software,
    surface: Surface,
    argb: Vec<Rgba>,
}

impl SoftwareRenderer {
    pub fn new(cfg: RenderConfig) -> Result<Self, RenderError> {
        let surface = Surface::new(&cfg)?;
        Ok(Self {
            backend: Software::new(cfg)?,
            surface,
            argb: Vec::new(),
        })
    }

    /// Switch resolution, window size, field of view or depth.
    pub fn resize(&mut self, cfg: RenderConfig) -> Result<(), RenderError> {
        self.surface = Surface::new(&cfg)?;
        self.backend.resize(cfg)
    }

    pub fn backend(&self) -> &Software {
        &self.backend
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Renderer for SoftwareRenderer {
    fn begin_frame(&mut self) {
        self.surface.clear();
    }

    fn render_view(
        &mut self,
        view: &ViewPoint,
        level: &Level,
        bank: &TextureBank,
    ) -> Result<FrameStats, RenderError> {
        self.backend.render_view(view, level, bank, &mut self.surface)
    }

    fn end_frame<F>(&mut self, palette: &Palette, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.surface.to_argb(palette, &mut self.argb);
        let (w, h) = self.surface.size();
        submit(&self.argb, w, h);
    }
}
