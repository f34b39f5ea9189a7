//! ---------------------------------------------------------------------------
//! Classic software (CPU) BSP renderer
//!
//! * Walks the level's BSP front to back and clips each wall against the
//!   screen columns already covered, so no Z-buffer is needed.
//! * Wall columns are drawn during the walk; floors and ceilings are
//!   collected into visplanes and drawn as spans right after it.
//! * Sprites and see-through mid textures are drawn last, back to front.
//!
//! Every per-frame store is cleared at the start of a frame and keeps its
//! capacity, so a steady-state frame does not allocate.
//! ---------------------------------------------------------------------------

mod bsp;
mod clip;
mod planes;
mod segs;
mod things;

use std::ops::{Index, IndexMut, Range};

use bitflags::bitflags;
use tracing::{info_span, trace, warn};

pub use clip::{ClipRange, Pieces, SolidSegs};
pub use planes::{PlaneKey, Visplane, VisplaneId};
pub use segs::{DrawSeg, Silhouette, SpriteClip};
pub use things::VisSprite;

use crate::{
    config::RenderConfig,
    draw::{DrawTables, DrawTarget, FuzzState},
    error::RenderError,
    fixed::Fixed,
    framebuffer::Surface,
    view::{ViewPoint, ViewState, Viewport},
    world::{Level, SectorId, SubsectorId, TextureBank},
};

use planes::{PlaneSet, RowCache};

/*───────────────────────────────────────────────────────────────────────*/
/*                        Soft capacity limits                           */
/*───────────────────────────────────────────────────────────────────────*/

/// Sizes of the fixed stores of the classic renderer. The stores here grow
/// past them; crossing one is logged once per frame.
pub const MAXVISPLANES: usize = 128;
pub const MAXDRAWSEGS: usize = 256;
pub const MAXVISSPRITES: usize = 128;
/// Opening slots per view column.
pub const OPENINGS_PER_COLUMN: usize = 64;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct Overflow: u8 {
        const VISPLANES  = 0x01;
        const DRAWSEGS   = 0x02;
        const VISSPRITES = 0x04;
        const OPENINGS   = 0x08;
    }
}

/// What one frame produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub subsectors: usize,
    pub drawsegs: usize,
    pub visplanes: usize,
    pub vissprites: usize,
    pub wall_columns: usize,
    pub openings: usize,
}

/*───────────────────────────────────────────────────────────────────────*/
/*                           Openings arena                              */
/*───────────────────────────────────────────────────────────────────────*/

/// Per-column clip rows and masked texture columns saved during the walk,
/// addressed by index ranges handed out by [`Openings::alloc`].
#[derive(Default, Debug)]
pub struct Openings {
    data: Vec<i16>,
    cursor: usize,
}

impl Openings {
    /// Allocate `len` consecutive slots and return the index range.
    pub fn alloc(&mut self, len: usize) -> Range<usize> {
        let start = self.cursor;
        self.cursor += len;

        if self.cursor > self.data.len() {
            self.data.resize(self.cursor.next_power_of_two(), 0);
        }
        start..start + len
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Slots handed out this frame.
    pub fn used(&self) -> usize {
        self.cursor
    }
}

impl Index<usize> for Openings {
    type Output = i16;
    fn index(&self, idx: usize) -> &i16 {
        &self.data[idx]
    }
}

impl IndexMut<usize> for Openings {
    fn index_mut(&mut self, idx: usize) -> &mut i16 {
        &mut self.data[idx]
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                          Per-frame stores                             */
/*───────────────────────────────────────────────────────────────────────*/

#[derive(Default)]
struct FrameState {
    solid: SolidSegs,
    /// Lowest row still covered from above, per column.
    ceilingclip: Vec<i16>,
    /// Highest row still covered from below, per column.
    floorclip: Vec<i16>,
    planes: PlaneSet,
    rows: Vec<RowCache>,
    spanstart: Vec<i32>,
    drawsegs: Vec<DrawSeg>,
    openings: Openings,
    sprites: Vec<VisSprite>,
    /// Sprite clip scratch, one entry per column.
    clipbot: Vec<i16>,
    cliptop: Vec<i16>,
    /// Frame number each sector last had its things projected in.
    sector_marks: Vec<u32>,
    frame: u32,
    visited: Vec<SubsectorId>,
    wall_columns: usize,
    fuzz: FuzzState,
    overflow: Overflow,
}

impl FrameState {
    fn begin(&mut self, vp: &Viewport, sectors: usize) {
        let w = vp.width as usize;
        let h = vp.height as usize;

        self.solid.clear(vp.width);
        self.ceilingclip.clear();
        self.ceilingclip.resize(w, -1);
        self.floorclip.clear();
        self.floorclip.resize(w, vp.height as i16);
        self.planes.clear(vp.width);
        self.rows.clear();
        self.rows.resize(h, RowCache::default());
        self.spanstart.resize(h, 0);
        self.drawsegs.clear();
        self.openings.reset();
        self.sprites.clear();
        self.clipbot.resize(w, 0);
        self.cliptop.resize(w, 0);

        if self.sector_marks.len() != sectors {
            self.sector_marks.clear();
            self.sector_marks.resize(sectors, 0);
        }
        self.frame = self.frame.wrapping_add(1);
        if self.frame == 0 {
            self.sector_marks.fill(0);
            self.frame = 1;
        }

        self.visited.clear();
        self.wall_columns = 0;
        self.fuzz.reset();
        self.overflow = Overflow::empty();
    }

    /// `true` the first time `sector` is seen this frame.
    fn mark_sector(&mut self, sector: SectorId) -> bool {
        match self.sector_marks.get_mut(sector as usize) {
            Some(m) if *m != self.frame => {
                *m = self.frame;
                true
            }
            _ => false,
        }
    }

    fn check_capacity(&mut self, flag: Overflow, what: &'static str, used: usize, cap: usize) {
        if used > cap && !self.overflow.contains(flag) {
            self.overflow |= flag;
            warn!(what, used, cap, "classic limit exceeded, growing");
        }
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                  */
/*───────────────────────────────────────────────────────────────────────*/

/// Doom-style BSP renderer. Owns the projection tables for one screen
/// configuration and the per-frame stores.
pub struct Software {
    cfg: RenderConfig,
    viewport: Viewport,
    st: FrameState,
}

impl Software {
    pub fn new(cfg: RenderConfig) -> Result<Self, RenderError> {
        let viewport = Viewport::new(&cfg)?;
        Ok(Self {
            cfg,
            viewport,
            st: FrameState::default(),
        })
    }

    /// Rebuild the projection tables for a new screen configuration.
    pub fn resize(&mut self, cfg: RenderConfig) -> Result<(), RenderError> {
        self.viewport = Viewport::new(&cfg)?;
        self.cfg = cfg;
        Ok(())
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Render one frame of `level` from `view` into `surface`.
    ///
    /// The level must have passed [`Level::validate`].
    pub fn render_view(
        &mut self,
        view: &ViewPoint,
        level: &Level,
        bank: &TextureBank,
        surface: &mut Surface,
    ) -> Result<FrameStats, RenderError> {
        let (got_w, got_h) = surface.size();
        if (got_w, got_h) != (self.cfg.screen_width, self.cfg.screen_height) {
            return Err(RenderError::FrameSize {
                want_w: self.cfg.screen_width,
                want_h: self.cfg.screen_height,
                got_w,
                got_h,
            });
        }

        let _span = info_span!("render_view", level = %level.name).entered();

        let state = self.viewport.setup_frame(view);
        self.st.begin(&self.viewport, level.sectors.len());

        let mut pass = RenderPass {
            view: state,
            vp: &self.viewport,
            level,
            bank,
            tables: DrawTables::from_bank(bank),
            target: surface.target(),
            st: &mut self.st,
            floorplane: None,
            ceilingplane: None,
        };
        pass.render_bsp();
        pass.draw_planes();
        pass.draw_masked();

        let stats = self.stats();
        trace!(
            subsectors = stats.subsectors,
            drawsegs = stats.drawsegs,
            visplanes = stats.visplanes,
            vissprites = stats.vissprites,
            openings = stats.openings,
            "frame done"
        );
        Ok(stats)
    }

    fn stats(&self) -> FrameStats {
        FrameStats {
            subsectors: self.st.visited.len(),
            drawsegs: self.st.drawsegs.len(),
            visplanes: self.st.planes.len(),
            vissprites: self.st.sprites.len(),
            wall_columns: self.st.wall_columns,
            openings: self.st.openings.used(),
        }
    }

    /// Subsectors reached by the last frame's walk, in visit order.
    pub fn visited_subsectors(&self) -> &[SubsectorId] {
        &self.st.visited
    }

    pub fn drawsegs(&self) -> &[DrawSeg] {
        &self.st.drawsegs
    }

    pub fn visplanes(&self) -> &[Visplane] {
        self.st.planes.planes()
    }

    /// Last frame's sprites, sorted back to front.
    pub fn vissprites(&self) -> &[VisSprite] {
        &self.st.sprites
    }

    pub fn openings(&self) -> &Openings {
        &self.st.openings
    }
}

/// Everything one frame's walk and draw passes need. Lives for a single
/// `render_view` call.
struct RenderPass<'f> {
    view: ViewState,
    vp: &'f Viewport,
    level: &'f Level,
    bank: &'f TextureBank,
    tables: DrawTables<'f>,
    target: DrawTarget<'f>,
    st: &'f mut FrameState,
    /// Planes of the subsector being walked.
    floorplane: Option<VisplaneId>,
    ceilingplane: Option<VisplaneId>,
}

impl<'f> RenderPass<'f> {
    #[inline]
    fn colormap(&self, idx: u8) -> &'f [u8; 256] {
        let maps = self.tables.colormaps;
        &maps[idx as usize]
    }

    /// Colormap for a wall or sprite: fixed override or banded by scale.
    #[inline]
    fn scale_colormap(&self, level: usize, scale: Fixed) -> &'f [u8; 256] {
        match self.view.fixed_colormap {
            Some(c) => self.colormap(c),
            None => self.colormap(self.vp.scale_light(level, scale)),
        }
    }
}

#[cfg(test)]
mod tests;
