use bitflags::bitflags;
use tracing::debug;

use crate::{
    error::RenderError,
    fixed::{Angle, Fixed},
    world::texture::{FlatId, TextureId},
};

pub type SubsectorId = u16;
pub type LinedefId = u16;
pub type SegmentId = u16;
pub type VertexId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;
pub type ThingId = u16;
pub type NodeId = u16;

/// Runtime snapshot of one map (immutable while rendering).
#[derive(Clone, Debug, Default)]
pub struct Level {
    pub name: String,
    pub things: Vec<Thing>,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub vertices: Vec<Vertex>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    pub sectors: Vec<Sector>,
}

/*------------------------- game objects -----------------------------*/

bitflags! {
    /// How a thing's sprite is drawn.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ThingFlags: u8 {
        /// Spectre fuzz.
        const SHADOW      = 0x01;
        const TRANSLUCENT = 0x02;
        /// Ignores sector light.
        const FULLBRIGHT  = 0x04;
        /// Mirror the patch horizontally.
        const FLIP        = 0x08;
    }
}

#[derive(Clone, Debug)]
pub struct Thing {
    pub x: Fixed,
    pub y: Fixed,
    /// Bottom of the sprite; `None` stands on the sector floor.
    pub z: Option<Fixed>,
    pub angle: Angle,
    pub type_id: u16,
    pub sprite: TextureId,
    pub flags: ThingFlags,
    /// Player colour remap, `0` for none.
    pub translation: u8,
    /// Sector under the thing (filled by `Level::finalise`).
    pub sector: SectorId,
}

/*--------------------------- linedefs -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE      = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0010;
        const LOWER_UNPEGGED  = 0x0020;
        const SECRET          = 0x0040;
        const BLOCK_SOUND     = 0x0080;
        const NOT_ON_MAP      = 0x0200;
    }
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    pub flags: LinedefFlags,
    pub special: u16,
    pub tag: u16,
    pub front_sidedef: Option<SidedefId>,
    pub back_sidedef: Option<SidedefId>,
}

/*--------------------------- sidedefs -------------------------------*/

#[derive(Clone, Debug)]
pub struct Sidedef {
    pub texture_offset: Fixed,
    pub row_offset: Fixed,
    /// `None` = no texture ("-" in map data).
    pub top: Option<TextureId>,
    pub bottom: Option<TextureId>,
    pub mid: Option<TextureId>,
    pub sector: SectorId,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
}

#[derive(Clone, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    pub angle: Angle,
    /// Distance along the linedef to the seg start.
    pub offset: Fixed,
    pub linedef: LinedefId,
    pub sidedef: SidedefId,
    pub front_sector: SectorId,
    /// `None` for one-sided lines.
    pub back_sector: Option<SectorId>,
}

#[derive(Clone, Debug)]
pub struct Subsector {
    pub first_seg: SegmentId,
    pub seg_count: u16,
    pub sector: SectorId,
}

/// Axis-aligned box in map units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BBox {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: Fixed,
    pub right: Fixed,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
    /// `[right/front, left/back]`.
    pub bbox: [BBox; 2],
    pub child: [u16; 2],
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_height: Fixed,
    pub ceiling_height: Fixed,
    pub floor_pic: FlatId,
    pub ceiling_pic: FlatId,
    /// 0‥255.
    pub light: i16,
    pub special: i16,
    pub tag: i16,
    /// Things standing in this sector (filled by `Level::finalise`).
    pub things: Vec<ThingId>,
}

/*------------------------ integrity checks --------------------------*/

impl Level {
    /// Check every cross reference the renderer follows without bounds
    /// checks of its own. Run once after loading.
    pub fn validate(&self) -> Result<(), RenderError> {
        let nsectors = self.sectors.len();
        let sector_ok = |what: &'static str, index: usize, sector: SectorId| {
            if (sector as usize) < nsectors {
                Ok(())
            } else {
                Err(RenderError::MissingSector {
                    what,
                    index,
                    sector: sector as usize,
                })
            }
        };
        let in_range = |what: &'static str, index: usize, target: &'static str, id: usize, len: usize| {
            if id < len {
                Ok(())
            } else {
                Err(RenderError::BadReference {
                    what,
                    index,
                    target,
                    id,
                })
            }
        };

        if self.subsectors.is_empty() {
            return Err(RenderError::BadReference {
                what: "level",
                index: 0,
                target: "subsector",
                id: 0,
            });
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.dx == 0 && node.dy == 0 {
                return Err(RenderError::DegeneratePartition { node: i });
            }
            for &child in &node.child {
                let ok = if child & super::bsp::NF_SUBSECTOR != 0 {
                    ((child & !super::bsp::NF_SUBSECTOR) as usize) < self.subsectors.len()
                } else {
                    // children are stored before their parents
                    (child as usize) < i
                };
                if !ok {
                    return Err(RenderError::BadChild { node: i, child });
                }
            }
        }

        for (i, ss) in self.subsectors.iter().enumerate() {
            let end = ss.first_seg as usize + ss.seg_count as usize;
            if ss.seg_count == 0 || end > self.segs.len() {
                return Err(RenderError::BadSegRange { subsector: i });
            }
            sector_ok("subsector", i, ss.sector)?;
        }

        for (i, seg) in self.segs.iter().enumerate() {
            in_range("seg", i, "vertex", seg.v1 as usize, self.vertices.len())?;
            in_range("seg", i, "vertex", seg.v2 as usize, self.vertices.len())?;
            in_range("seg", i, "linedef", seg.linedef as usize, self.linedefs.len())?;
            in_range("seg", i, "sidedef", seg.sidedef as usize, self.sidedefs.len())?;
            sector_ok("seg", i, seg.front_sector)?;
            if let Some(back) = seg.back_sector {
                sector_ok("seg", i, back)?;
            }
        }

        for (i, ld) in self.linedefs.iter().enumerate() {
            in_range("linedef", i, "vertex", ld.v1 as usize, self.vertices.len())?;
            in_range("linedef", i, "vertex", ld.v2 as usize, self.vertices.len())?;
            for side in [ld.front_sidedef, ld.back_sidedef].into_iter().flatten() {
                in_range("linedef", i, "sidedef", side as usize, self.sidedefs.len())?;
            }
        }

        for (i, sd) in self.sidedefs.iter().enumerate() {
            sector_ok("sidedef", i, sd.sector)?;
        }

        debug!(
            level = %self.name,
            nodes = self.nodes.len(),
            subsectors = self.subsectors.len(),
            segs = self.segs.len(),
            sectors = nsectors,
            "level validated"
        );
        Ok(())
    }

    /// Validate, then link every thing to the sector it stands in.
    pub fn finalise(&mut self) -> Result<(), RenderError> {
        self.validate()?;

        for sector in self.sectors.iter_mut() {
            sector.things.clear();
        }
        let homes: Vec<SectorId> = self
            .things
            .iter()
            .map(|t| self.subsectors[self.locate_subsector(t.x, t.y) as usize].sector)
            .collect();
        for (id, (thing, sector)) in self.things.iter_mut().zip(homes).enumerate() {
            thing.sector = sector;
            self.sectors[sector as usize].things.push(id as ThingId);
        }
        Ok(())
    }
}
