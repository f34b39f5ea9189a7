//! Synthetic levels and a matching texture set.
//!
//! Hand-built maps with hand-built BSP trees, small enough to reason
//! about in tests and to fly around in the viewer without an IWAD.

use crate::{
    error::RenderError,
    fixed::{Angle, FRACUNIT, Fixed, point_to_angle},
    world::{
        bsp::NF_SUBSECTOR,
        geometry::{
            BBox, Level, Linedef, LinedefFlags, LinedefId, Node, Sector, SectorId, Seg, Sidedef,
            Subsector, SubsectorId, Thing, ThingFlags, VertexId, Vertex,
        },
        texture::{FlatId, Flat, Palette, SKY_FLAT_NAME, Texture, TextureBank, TextureError, TextureId, Colormaps},
    },
};

/// Ids assigned by [`texture_bank`], in insertion order.
pub mod ids {
    use crate::world::texture::{FlatId, TextureId};

    pub const WALL: TextureId = 1;
    pub const GRATE: TextureId = 2;
    pub const SKY: TextureId = 3;
    pub const IMP: TextureId = 4;
    pub const PLAYER: TextureId = 5;

    pub const FLOOR: FlatId = 1;
    pub const CEIL: FlatId = 2;
    pub const SKY_FLAT: FlatId = 3;
}

/// One side of a line as the builder sees it.
#[derive(Clone, Copy, Debug)]
pub struct Side {
    pub sector: SectorId,
    pub top: Option<TextureId>,
    pub mid: Option<TextureId>,
    pub bottom: Option<TextureId>,
    pub x_off: i32,
    pub y_off: i32,
}

impl Side {
    /// Solid wall side.
    pub fn wall(sector: SectorId) -> Self {
        Self {
            sector,
            top: None,
            mid: Some(ids::WALL),
            bottom: None,
            x_off: 0,
            y_off: 0,
        }
    }

    /// Open side of a two-sided line; steps get the wall texture.
    pub fn portal(sector: SectorId) -> Self {
        Self {
            sector,
            top: Some(ids::WALL),
            mid: None,
            bottom: Some(ids::WALL),
            x_off: 0,
            y_off: 0,
        }
    }
}

#[derive(Default)]
pub struct LevelBuilder {
    level: Level,
    /// Bounding box per subsector, then per node.
    leaf_boxes: Vec<BBox>,
    node_boxes: Vec<BBox>,
}

#[inline]
fn units(v: i32) -> Fixed {
    v * FRACUNIT
}

impl LevelBuilder {
    pub fn new(name: &str) -> Self {
        let mut b = Self::default();
        b.level.name = name.to_string();
        b
    }

    pub fn vertex(&mut self, x: i32, y: i32) -> VertexId {
        self.level.vertices.push(Vertex {
            x: units(x),
            y: units(y),
        });
        (self.level.vertices.len() - 1) as VertexId
    }

    pub fn sector(&mut self, floor: i32, ceiling: i32, light: i16) -> SectorId {
        self.level.sectors.push(Sector {
            floor_height: units(floor),
            ceiling_height: units(ceiling),
            floor_pic: ids::FLOOR,
            ceiling_pic: ids::CEIL,
            light,
            special: 0,
            tag: 0,
            things: Vec::new(),
        });
        (self.level.sectors.len() - 1) as SectorId
    }

    pub fn sector_mut(&mut self, id: SectorId) -> &mut Sector {
        &mut self.level.sectors[id as usize]
    }

    fn sidedef(&mut self, side: Side) -> u16 {
        self.level.sidedefs.push(Sidedef {
            texture_offset: units(side.x_off),
            row_offset: units(side.y_off),
            top: side.top,
            bottom: side.bottom,
            mid: side.mid,
            sector: side.sector,
        });
        (self.level.sidedefs.len() - 1) as u16
    }

    /// Line from `v1` to `v2`; the front side is on the right.
    pub fn line(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        front: Side,
        back: Option<Side>,
        mut flags: LinedefFlags,
    ) -> LinedefId {
        let front_sidedef = Some(self.sidedef(front));
        let back_sidedef = back.map(|s| self.sidedef(s));
        if back_sidedef.is_some() {
            flags |= LinedefFlags::TWO_SIDED;
        } else {
            flags |= LinedefFlags::IMPASSABLE;
        }
        self.level.linedefs.push(Linedef {
            v1,
            v2,
            flags,
            special: 0,
            tag: 0,
            front_sidedef,
            back_sidedef,
        });
        (self.level.linedefs.len() - 1) as LinedefId
    }

    /// Convex leaf bounded by whole-line segs; `side` 0 walks the line
    /// forwards, 1 backwards. The sector comes from the first seg.
    pub fn subsector(&mut self, sides: &[(LinedefId, usize)]) -> SubsectorId {
        let first_seg = self.level.segs.len() as u16;
        let mut bbox = BBox {
            top: Fixed::MIN,
            bottom: Fixed::MAX,
            left: Fixed::MAX,
            right: Fixed::MIN,
        };

        for &(line, side) in sides {
            let ld = self.level.linedefs[line as usize].clone();
            let (v1, v2, sd, other) = if side == 0 {
                (ld.v1, ld.v2, ld.front_sidedef, ld.back_sidedef)
            } else {
                (ld.v2, ld.v1, ld.back_sidedef, ld.front_sidedef)
            };
            let sidedef = sd.unwrap_or_default();
            let a = self.level.vertices[v1 as usize];
            let b = self.level.vertices[v2 as usize];
            for p in [a, b] {
                bbox.top = bbox.top.max(p.y);
                bbox.bottom = bbox.bottom.min(p.y);
                bbox.left = bbox.left.min(p.x);
                bbox.right = bbox.right.max(p.x);
            }
            let sector_of = |s: u16| self.level.sidedefs[s as usize].sector;
            let seg = Seg {
                v1,
                v2,
                angle: point_to_angle(b.x - a.x, b.y - a.y),
                offset: 0,
                linedef: line,
                sidedef,
                front_sector: sector_of(sidedef),
                back_sector: other.map(sector_of),
            };
            self.level.segs.push(seg);
        }

        let seg_count = sides.len() as u16;
        let sector = self
            .level
            .segs
            .get(first_seg as usize)
            .map_or(0, |s| s.front_sector);
        self.level.subsectors.push(Subsector {
            first_seg,
            seg_count,
            sector,
        });
        self.leaf_boxes.push(bbox);
        (self.level.subsectors.len() - 1) as SubsectorId
    }

    /// Child handle for a subsector.
    pub fn leaf(ss: SubsectorId) -> u16 {
        ss | NF_SUBSECTOR
    }

    fn child_box(&self, child: u16) -> BBox {
        if child & NF_SUBSECTOR != 0 {
            self.leaf_boxes[(child & !NF_SUBSECTOR) as usize]
        } else {
            self.node_boxes[child as usize]
        }
    }

    /// Partition node; `front` lies to the right of the direction.
    pub fn node(&mut self, x: i32, y: i32, dx: i32, dy: i32, front: u16, back: u16) -> u16 {
        let bbox = [self.child_box(front), self.child_box(back)];
        self.node_boxes.push(BBox {
            top: bbox[0].top.max(bbox[1].top),
            bottom: bbox[0].bottom.min(bbox[1].bottom),
            left: bbox[0].left.min(bbox[1].left),
            right: bbox[0].right.max(bbox[1].right),
        });
        self.level.nodes.push(Node {
            x: units(x),
            y: units(y),
            dx: units(dx),
            dy: units(dy),
            bbox,
            child: [front, back],
        });
        (self.level.nodes.len() - 1) as u16
    }

    pub fn thing(&mut self, x: i32, y: i32, sprite: TextureId, flags: ThingFlags, translation: u8) -> &mut Self {
        self.level.things.push(Thing {
            x: units(x),
            y: units(y),
            z: None,
            angle: 0 as Angle,
            type_id: 0,
            sprite,
            flags,
            translation,
            sector: 0,
        });
        self
    }

    /// Validate and link things.
    pub fn build(self) -> Result<Level, RenderError> {
        let mut level = self.level;
        level.finalise()?;
        Ok(level)
    }

    /*──────────────────────────── presets ────────────────────────────*/

    /// 256×256 box, floor 0, ceiling 128, no nodes.
    pub fn single_room() -> Self {
        let mut b = Self::new("ROOM");
        let s = b.sector(0, 128, 160);
        let v = [
            b.vertex(-128, -128),
            b.vertex(-128, 128),
            b.vertex(128, 128),
            b.vertex(128, -128),
        ];
        let lines: Vec<_> = (0..4)
            .map(|i| b.line(v[i], v[(i + 1) % 4], Side::wall(s), None, LinedefFlags::empty()))
            .collect();
        b.subsector(&[(lines[0], 0), (lines[1], 0), (lines[2], 0), (lines[3], 0)]);
        b
    }

    /// The same box cut at `x = 0` into a west and an east sector with
    /// their own floor heights, one node between them.
    pub fn split_room(west_floor: i32, east_floor: i32) -> Self {
        Self::split(128, west_floor, east_floor).0
    }

    fn split(half: i32, west_floor: i32, east_floor: i32) -> (Self, [LinedefId; 7], [SectorId; 2]) {
        let h = half;
        let mut b = Self::new("SPLIT");
        let west = b.sector(west_floor, 128, 160);
        let east = b.sector(east_floor, 128, 160);
        let v = [
            b.vertex(-h, -h),
            b.vertex(-h, h),
            b.vertex(0, h),
            b.vertex(h, h),
            b.vertex(h, -h),
            b.vertex(0, -h),
        ];
        let none = LinedefFlags::empty();
        let l = [
            b.line(v[0], v[1], Side::wall(west), None, none),
            b.line(v[1], v[2], Side::wall(west), None, none),
            b.line(v[2], v[3], Side::wall(east), None, none),
            b.line(v[3], v[4], Side::wall(east), None, none),
            b.line(v[4], v[5], Side::wall(east), None, none),
            b.line(v[5], v[0], Side::wall(west), None, none),
            // divider runs north, so east is its front
            b.line(v[5], v[2], Side::portal(east), Some(Side::portal(west)), none),
        ];
        let ss_west = b.subsector(&[(l[0], 0), (l[1], 0), (l[6], 1), (l[5], 0)]);
        let ss_east = b.subsector(&[(l[2], 0), (l[3], 0), (l[4], 0), (l[6], 0)]);
        b.node(0, -h, 0, 2 * h, Self::leaf(ss_east), Self::leaf(ss_west));
        (b, l, [west, east])
    }

    /// Split room dressed up for the viewer: a raised sky-lit east half,
    /// a see-through grate and a handful of sprites.
    pub fn showcase() -> Self {
        let (mut b, lines, [west, east]) = Self::split(256, 0, 24);
        b.sector_mut(west).light = 192;
        {
            let e = b.sector_mut(east);
            e.light = 144;
            e.ceiling_height = units(200);
            e.ceiling_pic = ids::SKY_FLAT;
        }
        let divider = lines[6] as usize;
        for sd in [b.level.linedefs[divider].front_sidedef, b.level.linedefs[divider].back_sidedef]
            .into_iter()
            .flatten()
        {
            b.level.sidedefs[sd as usize].mid = Some(ids::GRATE);
        }
        b.level.linedefs[divider].flags |= LinedefFlags::LOWER_UNPEGGED;

        b.thing(-128, 64, ids::IMP, ThingFlags::empty(), 0)
            .thing(-160, -96, ids::IMP, ThingFlags::SHADOW, 0)
            .thing(96, 160, ids::IMP, ThingFlags::TRANSLUCENT | ThingFlags::FLIP, 0)
            .thing(160, 0, ids::PLAYER, ThingFlags::empty(), 3)
            .thing(160, -96, ids::PLAYER, ThingFlags::FULLBRIGHT, 1);
        b
    }
}

/*─────────────────────────── demo textures ─────────────────────────────*/

const RAMP_BASES: [(u32, u32, u32); 16] = [
    (224, 224, 224),
    (255, 200, 160),
    (255, 40, 40),
    (255, 150, 50),
    (160, 110, 60),
    (255, 230, 80),
    (180, 180, 180),
    (80, 220, 80),
    (80, 120, 255),
    (200, 90, 220),
    (80, 220, 220),
    (200, 170, 120),
    (60, 130, 60),
    (150, 30, 30),
    (120, 140, 170),
    (230, 190, 60),
];

/// Sixteen 16-step ramps, bright to dark; index 0 is black.
pub fn palette() -> Palette {
    let mut pal = Palette::default();
    for i in 0..256usize {
        let (r, g, b) = RAMP_BASES[i >> 4];
        let keep = 16 - (i as u32 & 15);
        pal[i] = 0xff00_0000 | ((r * keep / 16) << 16) | ((g * keep / 16) << 8) | (b * keep / 16);
    }
    pal[0] = 0xff00_0000;
    pal
}

/// Procedural wall, grate, sky, sprites and flats under the [`ids`] handles.
pub fn texture_bank() -> Result<TextureBank, TextureError> {
    let mut bank = TextureBank::default_with_checker();
    let pal = palette();
    bank.set_colormaps(Colormaps::from_palette(&pal));
    bank.set_palette(pal);

    bank.insert(
        "STARTAN",
        Texture::from_fn("STARTAN", 64, 128, |x, y| {
            let row = y / 16;
            let mortar = y % 16 == 0 || (x + (row % 2) * 16) % 32 == 0;
            Some(if mortar { 0x6c } else { 0x22 + ((x * 7 + y * 3) % 4) as u8 })
        }),
    )?;
    bank.insert(
        "GRATE",
        Texture::from_fn("GRATE", 64, 64, |x, y| (x % 8 < 2 || y % 8 < 2).then_some(0xe4)),
    )?;
    let sky = bank.insert(
        "SKY1",
        Texture::from_fn("SKY1", 256, 128, |x, y| {
            let ridge = 96 + (x * 13 % 17) + (x / 16 % 3) * 4;
            Some(if y > ridge { 0xc8 } else { 0x80 + (15 - (y / 8).min(15)) as u8 })
        }),
    )?;
    bank.set_sky_texture(sky);

    bank.insert("TROOA1", blob("TROOA1", 40, 56, 0x40))?;
    bank.insert("PLAYA1", blob("PLAYA1", 36, 52, 0x70))?;

    bank.insert_flat(Flat::from_fn("FLOOR4_8", |x, y| {
        if (x / 8 + y / 8) % 2 == 0 { 0x64 } else { 0x68 }
    }))?;
    bank.insert_flat(Flat::from_fn("CEIL3_5", |x, y| 0xe2 + ((x ^ y) & 3) as u8))?;
    bank.insert_flat(Flat::from_fn(SKY_FLAT_NAME, |_, _| 0))?;

    debug_assert_eq!(bank.id("PLAYA1"), Some(ids::PLAYER));
    debug_assert_eq!(bank.flat_id(SKY_FLAT_NAME), Some(ids::SKY_FLAT as FlatId));
    Ok(bank)
}

/// Shaded ellipse standing on its bottom edge.
fn blob(name: &str, w: usize, h: usize, ramp: u8) -> Texture {
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    Texture::from_fn(name, w, h, |x, y| {
        let nx = (x as f32 + 0.5 - cx) / cx;
        let ny = (y as f32 + 0.5 - cy) / cy;
        let d = nx * nx + ny * ny;
        (d <= 1.0).then(|| ramp + (d * 12.0) as u8)
    })
    .with_offsets(w as i32 / 2, h as i32 - 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{ANG90, ANG270};

    #[test]
    fn single_room_is_valid() {
        let lvl = LevelBuilder::single_room().build().unwrap();
        assert_eq!(lvl.segs.len(), 4);
        assert!(lvl.nodes.is_empty());
        // west wall runs north
        assert!(lvl.segs[0].angle.abs_diff(ANG90) <= 1);
        assert!(lvl.segs.iter().all(|s| s.back_sector.is_none()));
    }

    #[test]
    fn split_room_divider_is_two_sided() {
        let lvl = LevelBuilder::split_room(0, 32).build().unwrap();
        assert_eq!(lvl.nodes.len(), 1);
        let portals: Vec<_> = lvl.segs.iter().filter(|s| s.back_sector.is_some()).collect();
        assert_eq!(portals.len(), 2);
        assert_ne!(portals[0].front_sector, portals[1].front_sector);
        // one faces south, the other north
        let mut angles: Vec<_> = portals.iter().map(|s| s.angle).collect();
        angles.sort();
        assert!(angles[0].abs_diff(ANG90) <= 1);
        assert!(angles[1].abs_diff(ANG270) <= 1);
        let n = &lvl.nodes[0];
        assert_eq!(n.bbox[0].left, 0);
        assert_eq!(n.bbox[1].right, 0);
    }

    #[test]
    fn showcase_links_things() {
        let lvl = LevelBuilder::showcase().build().unwrap();
        assert_eq!(lvl.things.len(), 5);
        let total: usize = lvl.sectors.iter().map(|s| s.things.len()).sum();
        assert_eq!(total, 5);
        assert_eq!(lvl.things[3].sector, 1);
        assert_eq!(lvl.things[0].sector, 0);
    }

    #[test]
    fn bank_ids_match_constants() {
        let bank = texture_bank().unwrap();
        assert_eq!(bank.id("STARTAN"), Some(ids::WALL));
        assert_eq!(bank.id("GRATE"), Some(ids::GRATE));
        assert_eq!(bank.sky_texture(), ids::SKY);
        assert_eq!(bank.id("TROOA1"), Some(ids::IMP));
        assert_eq!(bank.flat_id("FLOOR4_8"), Some(ids::FLOOR));
        assert_eq!(bank.flat_id("CEIL3_5"), Some(ids::CEIL));
        assert!(bank.is_sky(ids::SKY_FLAT));
        // grate has holes
        assert!(bank.texture(ids::GRATE).unwrap().posts(4).len() > 1);
    }

    #[test]
    fn broken_levels_are_rejected() {
        let mut lvl = LevelBuilder::split_room(0, 0).build().unwrap();
        lvl.nodes[0].dx = 0;
        lvl.nodes[0].dy = 0;
        assert_eq!(lvl.validate(), Err(RenderError::DegeneratePartition { node: 0 }));

        let mut lvl = LevelBuilder::split_room(0, 0).build().unwrap();
        lvl.nodes[0].child[1] = 5;
        assert_eq!(lvl.validate(), Err(RenderError::BadChild { node: 0, child: 5 }));

        let mut lvl = LevelBuilder::single_room().build().unwrap();
        lvl.segs[2].front_sector = 9;
        assert!(matches!(lvl.validate(), Err(RenderError::MissingSector { what: "seg", index: 2, sector: 9 })));

        let mut lvl = LevelBuilder::single_room().build().unwrap();
        lvl.subsectors[0].seg_count = 7;
        assert_eq!(lvl.validate(), Err(RenderError::BadSegRange { subsector: 0 }));
    }
}
