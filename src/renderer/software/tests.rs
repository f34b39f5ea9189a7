use std::collections::{BTreeSet, HashSet};

use super::*;
use crate::{
    config::PixelDepth,
    fixed::{ANG45, ANG90, ANG180, ANG270, Angle, fixed_div, int_to_fixed},
    world::{
        LinedefFlags, SectorId, SubsectorId, TextureBank,
        demo::{LevelBuilder, Side, ids, texture_bank},
    },
};

const EYE: i32 = 41;

fn eye(x: i32, y: i32, floor: i32, angle: Angle) -> ViewPoint {
    ViewPoint {
        x: int_to_fixed(x),
        y: int_to_fixed(y),
        z: int_to_fixed(floor + EYE),
        angle,
        ..Default::default()
    }
}

struct Rig {
    sw: Software,
    surface: Surface,
    bank: TextureBank,
}

fn rig(cfg: RenderConfig) -> Rig {
    Rig {
        surface: Surface::new(&cfg).unwrap(),
        sw: Software::new(cfg).unwrap(),
        bank: texture_bank().unwrap(),
    }
}

impl Rig {
    fn render(&mut self, view: &ViewPoint, level: &Level) -> FrameStats {
        self.sw
            .render_view(view, level, &self.bank, &mut self.surface)
            .unwrap()
    }

    fn argb(&self) -> Vec<u32> {
        let mut out = Vec::new();
        self.surface.to_argb(self.bank.palette(), &mut out);
        out
    }
}

/// Columns covered by the drawsegs of one seg, merged.
fn seg_columns(sw: &Software, seg: usize) -> BTreeSet<i32> {
    sw.drawsegs()
        .iter()
        .filter(|ds| ds.seg == seg)
        .flat_map(|ds| ds.x1..=ds.x2)
        .collect()
}

fn is_contiguous(cols: &BTreeSet<i32>) -> bool {
    match (cols.first(), cols.last()) {
        (Some(&a), Some(&b)) => (b - a + 1) as usize == cols.len(),
        _ => true,
    }
}

fn floor_heights(sw: &Software) -> BTreeSet<Fixed> {
    sw.visplanes()
        .iter()
        .filter(|p| p.key.picnum == ids::FLOOR && p.minx <= p.maxx)
        .map(|p| p.key.height)
        .collect()
}

/// Every pixel belongs to at most one plane and no column is inverted.
fn assert_planes_disjoint(sw: &Software, height: i32) {
    let mut seen = HashSet::new();
    for (i, pl) in sw.visplanes().iter().enumerate() {
        for (x, top, bottom) in pl.columns() {
            assert!(top <= bottom, "plane {i} column {x}: {top} > {bottom}");
            assert!((bottom as i32) < height);
            for y in top..=bottom {
                assert!(seen.insert((x, y)), "plane {i} overlaps at ({x}, {y})");
            }
        }
    }
}

#[test]
fn room_walls_tile_the_screen_from_every_side() {
    let level = LevelBuilder::single_room().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    let mut walls_seen = BTreeSet::new();

    for angle in [0, ANG90, ANG180, ANG270] {
        let stats = r.render(&eye(0, 0, 0, angle), &level);

        // a closed room: each column gets exactly one wall
        let mut covered = vec![0u32; 320];
        for ds in r.sw.drawsegs() {
            for x in ds.x1..=ds.x2 {
                covered[x as usize] += 1;
            }
            walls_seen.insert(ds.seg);
        }
        assert!(covered.iter().all(|&c| c == 1), "angle {angle:#x}: {covered:?}");
        assert_eq!(stats.wall_columns, 320);

        for seg in 0..4 {
            assert!(is_contiguous(&seg_columns(&r.sw, seg)));
        }

        let floors = r.sw.visplanes().iter().filter(|p| p.key.picnum == ids::FLOOR).count();
        let ceilings = r.sw.visplanes().iter().filter(|p| p.key.picnum == ids::CEIL).count();
        assert_eq!((floors, ceilings), (1, 1));
        assert_planes_disjoint(&r.sw, 200);
    }
    assert_eq!(walls_seen.len(), 4);
}

#[test]
fn facing_wall_scale_is_projection_over_distance() {
    let level = LevelBuilder::single_room().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    // east wall is 128 units ahead
    r.render(&eye(0, 0, 0, 0), &level);

    let want = fixed_div(r.sw.viewport().focal_y, int_to_fixed(128));
    let east: Vec<_> = r.sw.drawsegs().iter().filter(|ds| ds.seg == 2).collect();
    assert!(!east.is_empty());
    for ds in east {
        for s in [ds.scale1, ds.scale2] {
            assert!((s - want).abs() <= want / 200, "scale {s} vs {want}");
        }
    }
}

#[test]
fn same_frame_twice_is_identical() {
    let level = LevelBuilder::showcase().build().unwrap();
    for depth in [PixelDepth::Paletted, PixelDepth::TrueColor] {
        let mut r = rig(RenderConfig::fullscreen(320, 200).with_depth(depth));
        let view = eye(-240, 16, 0, 0x0800_0000);

        r.render(&view, &level);
        let first = r.argb();
        r.surface.clear();
        r.render(&view, &level);
        assert_eq!(first, r.argb(), "{depth:?}");
    }
}

#[test]
fn raised_half_gets_its_own_floor_plane() {
    let level = LevelBuilder::split_room(0, 32).build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    r.render(&eye(-100, 0, 0, ANG45 / 2), &level);

    assert_eq!(
        floor_heights(&r.sw),
        BTreeSet::from([0, int_to_fixed(32)])
    );

    // the raised floor only shows through the divider
    let divider: BTreeSet<i32> = level
        .segs
        .iter()
        .enumerate()
        .filter(|(_, s)| s.back_sector.is_some())
        .flat_map(|(i, _)| seg_columns(&r.sw, i))
        .collect();
    for pl in r.sw.visplanes() {
        if pl.key.picnum == ids::FLOOR && pl.key.height == int_to_fixed(32) {
            for (x, _, _) in pl.columns() {
                assert!(divider.contains(&x), "column {x} outside the divider");
            }
        }
    }
    assert_planes_disjoint(&r.sw, 200);
}

#[test]
fn walk_reaches_both_halves_and_starts_at_the_viewer() {
    let level = LevelBuilder::split_room(0, 0).build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));

    let here = level.locate_subsector(int_to_fixed(-64), 0);
    r.render(&eye(-64, 0, 0, 0), &level);
    let visited = r.sw.visited_subsectors().to_vec();
    assert_eq!(visited.first(), Some(&here));
    assert_eq!(visited.len(), 2);

    // facing away from the other half, its box is culled
    r.render(&eye(-64, 0, 0, ANG180), &level);
    assert_eq!(r.sw.visited_subsectors(), &[here]);
}

/// 512×512 room with a 64×64 closet at x 64..128, y -32..32. Returns
/// the level and its subsectors `[west, north, south, east strip, closet]`.
///
/// ```text
/// root x=64 ── west
///   └ y=32 ── north
///       └ y=-32 ── south
///           └ x=128 ── east strip | closet
/// ```
fn closet_room() -> (Level, [SubsectorId; 5]) {
    let mut b = LevelBuilder::new("CLOSET");
    let room = b.sector(0, 128, 160);
    let closet = b.sector(0, 128, 160);
    let none = LinedefFlags::empty();
    let wall = |b: &mut LevelBuilder, s: SectorId, (x1, y1): (i32, i32), (x2, y2): (i32, i32)| {
        let (v1, v2) = (b.vertex(x1, y1), b.vertex(x2, y2));
        (b.line(v1, v2, Side::wall(s), None, none), 0)
    };

    let west = [
        wall(&mut b, room, (-256, -256), (-256, 256)),
        wall(&mut b, room, (-256, 256), (64, 256)),
        wall(&mut b, room, (64, 32), (64, -32)),
        wall(&mut b, room, (64, -256), (-256, -256)),
    ];
    let north = [
        wall(&mut b, room, (64, 256), (256, 256)),
        wall(&mut b, room, (256, 256), (256, 32)),
        wall(&mut b, room, (128, 32), (64, 32)),
    ];
    let south = [
        wall(&mut b, room, (256, -32), (256, -256)),
        wall(&mut b, room, (256, -256), (64, -256)),
        wall(&mut b, room, (64, -32), (128, -32)),
    ];
    let east = [
        wall(&mut b, room, (256, 32), (256, -32)),
        wall(&mut b, room, (128, -32), (128, 32)),
    ];
    let inside = [
        wall(&mut b, closet, (64, -32), (64, 32)),
        wall(&mut b, closet, (64, 32), (128, 32)),
        wall(&mut b, closet, (128, 32), (128, -32)),
        wall(&mut b, closet, (128, -32), (64, -32)),
    ];
    let ss = [
        b.subsector(&west),
        b.subsector(&north),
        b.subsector(&south),
        b.subsector(&east),
        b.subsector(&inside),
    ];
    let leaf = LevelBuilder::leaf;
    let strip = b.node(128, -32, 0, 64, leaf(ss[3]), leaf(ss[4]));
    let lower = b.node(64, -32, 192, 0, leaf(ss[2]), strip);
    let upper = b.node(64, 32, 192, 0, lower, leaf(ss[1]));
    b.node(64, -256, 0, 512, upper, leaf(ss[0]));
    (b.build().unwrap(), ss)
}

#[test]
fn walk_skips_subtrees_hidden_behind_the_closet() {
    let (level, [west, north, south, east, closet]) = closet_room();
    assert_eq!(level.nodes.len(), 4);
    let mut r = rig(RenderConfig::fullscreen(320, 200));

    // from the west the closet face hides the strip behind it; the closet
    // itself is on the near side of its node and is entered, but its
    // inward walls face away
    r.render(&eye(-128, 0, 0, 0), &level);
    assert_eq!(r.sw.visited_subsectors(), &[west, closet, south, north]);
    let closet_first_seg = level.subsectors[closet as usize].first_seg as usize;
    assert!(r.sw.drawsegs().iter().all(|ds| ds.seg < closet_first_seg));

    // from the east strip the closet is the far child and is culled whole
    r.render(&eye(192, 0, 0, ANG180), &level);
    assert_eq!(r.sw.visited_subsectors(), &[east, south, north, west]);
}

#[test]
fn bottom_pegged_walls_near_the_height_limit() {
    // floor plus texture height passes the largest fixed-point height
    let mut level = LevelBuilder::split_room(0, 0).build().unwrap();
    for s in &mut level.sectors {
        s.floor_height = int_to_fixed(32710);
        s.ceiling_height = int_to_fixed(32767);
    }
    for l in &mut level.linedefs {
        l.flags |= LinedefFlags::LOWER_UNPEGGED;
    }
    let divider = level.linedefs[6].clone();
    for sd in [divider.front_sidedef, divider.back_sidedef].into_iter().flatten() {
        level.sidedefs[sd as usize].mid = Some(ids::GRATE);
    }

    let mut r = rig(RenderConfig::fullscreen(320, 200));
    for angle in [0, ANG90, ANG180, ANG270] {
        let stats = r.render(&eye(-64, 0, 32710, angle), &level);
        assert!(stats.wall_columns >= 320, "angle {angle:#x}");
    }
    r.render(&eye(-64, 0, 32710, 0), &level);
    assert!(r.sw.drawsegs().iter().any(|ds| ds.maskedtexturecol.is_some()));
}

#[test]
fn wrong_sized_surface_is_rejected() {
    let level = LevelBuilder::single_room().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    let mut small = Surface::new(&RenderConfig::fullscreen(160, 100)).unwrap();

    let err = r
        .sw
        .render_view(&eye(0, 0, 0, 0), &level, &r.bank, &mut small)
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::FrameSize {
            want_w: 320,
            want_h: 200,
            got_w: 160,
            got_h: 100,
        }
    );
}

#[test]
fn showcase_sprites_sky_and_grate() {
    let level = LevelBuilder::showcase().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    // in the raised east half, two players ahead under the sky
    let stats = r.render(&eye(40, 0, 24, 0), &level);

    assert!(stats.vissprites >= 2);
    let scales: Vec<_> = r.sw.vissprites().iter().map(|s| s.scale).collect();
    assert!(scales.windows(2).all(|w| w[0] <= w[1]), "not back to front");
    for s in r.sw.vissprites() {
        assert!(0 <= s.x1 && s.x1 <= s.x2 && s.x2 < 320);
        assert!(s.gzt > s.gz);
    }

    // sky surfaces collapse to one key
    let sky: Vec<_> = r
        .sw
        .visplanes()
        .iter()
        .filter(|p| p.key.picnum == ids::SKY_FLAT)
        .collect();
    assert!(!sky.is_empty());
    assert!(sky.iter().all(|p| p.key.height == 0 && p.key.light == 0));

    // from the west, the grate leaves a masked drawseg with saved columns
    let stats = r.render(&eye(-240, 0, 0, 0), &level);
    assert!(r.sw.drawsegs().iter().any(|ds| ds.maskedtexturecol.is_some()));
    assert!(stats.openings > 0);
}

#[test]
fn odd_views_and_shrunk_windows_stay_in_bounds() {
    let level = LevelBuilder::showcase().build().unwrap();
    let cfgs = [
        RenderConfig::fullscreen(320, 200),
        RenderConfig::fullscreen(640, 400).with_blocks(7),
        RenderConfig::fullscreen(427, 240).with_depth(PixelDepth::TrueColor),
    ];
    for cfg in cfgs {
        let mut r = rig(cfg);
        for (i, angle) in (0..16u32).map(|i| i.wrapping_mul(0x1000_0000)).enumerate() {
            let mut view = eye(-200 + 24 * i as i32, -150 + 19 * i as i32, 0, angle);
            view.pitch = if i % 3 == 0 { -(ANG45 as i32) / 2 } else { (i as i32) << 24 };
            view.extralight = (i % 3) as i32;
            let stats = r.render(&view, &level);
            assert!(stats.subsectors >= 1);
        }
    }
}

#[test]
fn fixed_colormap_paints_every_pixel_through_it() {
    let level = LevelBuilder::single_room().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(64, 40));
    let mut view = eye(0, 0, 0, ANG45);
    view.fixed_colormap = Some(31);
    r.render(&view, &level);

    let dark = &r.bank.colormaps()[31];
    let Surface::Paletted(fb) = &r.surface else {
        unreachable!()
    };
    let palette_of_dark: HashSet<u8> = dark.iter().copied().collect();
    for y in 0..40 {
        for x in 0..64 {
            let px = fb.get(x, y).unwrap();
            assert!(palette_of_dark.contains(&px), "({x}, {y}) = {px}");
        }
    }
}

#[test]
fn stores_are_reset_between_frames() {
    let level = LevelBuilder::showcase().build().unwrap();
    let mut r = rig(RenderConfig::fullscreen(320, 200));
    let near = eye(-240, 0, 0, 0);
    let a = r.render(&near, &level);
    // a different frame in between must not leak into the repeat
    r.render(&eye(200, 100, 24, ANG180), &level);
    let b = r.render(&near, &level);
    assert_eq!(a, b);
    assert_eq!(r.sw.openings().used(), a.openings);
}
