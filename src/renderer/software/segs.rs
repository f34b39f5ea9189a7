//! Wall projection: one seg's visible column range becomes wall columns,
//! visplane rows, updated clip arrays and a [`DrawSeg`] for the masked pass.

use bitflags::bitflags;

use super::{MAXDRAWSEGS, OPENINGS_PER_COLUMN, Openings, Overflow, RenderPass, things::MaskedColumn};
use crate::{
    draw::{ColumnDrawContext, ColumnKind},
    fixed::{
        ANG90, ANG180, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, fine, finesine, finetangent,
        fixed_div, fixed_mul, point_to_dist,
    },
    view::lights::{LIGHTLEVELS, LIGHTSEGSHIFT},
    world::{LinedefFlags, NO_TEXTURE, SectorId, Seg, Texture},
};

/// Wall edges are stepped with this many fraction bits.
const HEIGHTBITS: u32 = 12;
const HEIGHTUNIT: i32 = 1 << HEIGHTBITS;

pub const MIN_SCALE: Fixed = 256;
pub const MAX_SCALE: Fixed = 64 * FRACUNIT;

/// Marks a masked column that has already been drawn.
const MASKED_DONE: i16 = i16::MAX;

bitflags! {
    /// Which edges of a drawseg clip sprites behind it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Silhouette: u8 {
        const BOTTOM = 0x01;
        const TOP    = 0x02;
        const SOLID  = 0x03;
    }
}

/// Where a drawseg's sprite clip rows come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpriteClip {
    #[default]
    None,
    /// The wall closes the whole column.
    Closed,
    /// Saved rows, `openings[base + (x - x1)]`.
    Saved(usize),
}

/// A wall range kept for sprite clipping and the masked pass.
#[derive(Clone, Copy, Debug)]
pub struct DrawSeg {
    pub seg: usize,
    pub x1: i32,
    pub x2: i32,
    pub scale1: Fixed,
    pub scale2: Fixed,
    pub scalestep: Fixed,
    pub silhouette: Silhouette,
    /// Sprites standing at or above this are not clipped from below.
    pub bsilheight: Fixed,
    /// Sprites topping out at or below this are not clipped from above.
    pub tsilheight: Fixed,
    pub sprtopclip: SpriteClip,
    pub sprbottomclip: SpriteClip,
    /// Masked mid texture column per x, `openings[base + (x - x1)]`.
    pub maskedtexturecol: Option<usize>,
}

impl DrawSeg {
    /// Last row hidden from above at `x`, if this seg clips from above.
    pub fn top_clip(&self, openings: &Openings, x: i32, view_height: i32) -> Option<i16> {
        match self.sprtopclip {
            SpriteClip::None => None,
            SpriteClip::Closed => Some(view_height as i16),
            SpriteClip::Saved(base) => Some(openings[base + (x - self.x1) as usize]),
        }
    }

    /// First row hidden from below at `x`, if this seg clips from below.
    pub fn bottom_clip(&self, openings: &Openings, x: i32) -> Option<i16> {
        match self.sprbottomclip {
            SpriteClip::None => None,
            SpriteClip::Closed => Some(-1),
            SpriteClip::Saved(base) => Some(openings[base + (x - self.x1) as usize]),
        }
    }
}

/// Vertical scale of a wall at absolute angle `visangle`.
///
/// `normal` and `distance` describe the wall's line relative to the
/// viewer. The result is always within `[MIN_SCALE, MAX_SCALE]`.
pub fn scale_from_global_angle(
    visangle: Angle,
    view_angle: Angle,
    normal: Angle,
    distance: Fixed,
    projection: Fixed,
) -> Fixed {
    let anglea = ANG90.wrapping_add(visangle.wrapping_sub(view_angle));
    let angleb = ANG90.wrapping_add(visangle.wrapping_sub(normal));
    let sinea = finesine(fine(anglea));
    let sineb = finesine(fine(angleb));
    let num = fixed_mul(projection, sineb);
    let den = fixed_mul(distance, sinea);

    if den > num >> FRACBITS {
        fixed_div(num, den).clamp(MIN_SCALE, MAX_SCALE)
    } else {
        MAX_SCALE
    }
}

/// Per-column values shared by the tiers of one wall column.
struct WallColumn<'t> {
    x: i32,
    texturecolumn: i32,
    iscale: Fixed,
    colormap: &'t [u8; 256],
}

/// Loop state of one wall range, stepped column by column.
#[derive(Default)]
struct WallRange<'t> {
    start: i32,
    stop: i32,
    scale: Fixed,
    scalestep: Fixed,
    topfrac: Fixed,
    topstep: Fixed,
    bottomfrac: Fixed,
    bottomstep: Fixed,
    pixhigh: Fixed,
    pixhighstep: Fixed,
    pixlow: Fixed,
    pixlowstep: Fixed,
    mid: Option<&'t Texture>,
    top: Option<&'t Texture>,
    bottom: Option<&'t Texture>,
    masked: Option<(usize, &'t Texture)>,
    midtexturemid: Fixed,
    toptexturemid: Fixed,
    bottomtexturemid: Fixed,
    segtextured: bool,
    markfloor: bool,
    markceiling: bool,
    offset: Fixed,
    centerangle: Angle,
    distance: Fixed,
    light: usize,
}

impl<'f> RenderPass<'f> {
    /// Light row for a wall: axis-aligned walls get a step of fake contrast.
    pub(super) fn seg_light(&self, seg: &Seg, sector_light: i16) -> usize {
        let v1 = self.level.vertices[seg.v1 as usize];
        let v2 = self.level.vertices[seg.v2 as usize];
        let mut lightnum = (sector_light as i32 >> LIGHTSEGSHIFT) + self.view.extralight;
        if v1.y == v2.y {
            lightnum -= 1;
        } else if v1.x == v2.x {
            lightnum += 1;
        }
        lightnum.clamp(0, LIGHTLEVELS as i32 - 1) as usize
    }

    #[inline]
    fn scale_at(&self, x: i32, normal: Angle, distance: Fixed) -> Fixed {
        scale_from_global_angle(
            self.view.angle.wrapping_add(self.vp.xtoviewangle[x as usize]),
            self.view.angle,
            normal,
            distance,
            self.view.projection_y,
        )
    }

    /// Project and draw columns `start..=stop` of seg `seg_id`, seen from
    /// sector `front_id`. `angle1` is the absolute angle to the seg's start.
    pub(super) fn store_wall_range(
        &mut self,
        seg_id: usize,
        front_id: SectorId,
        angle1: Angle,
        start: i32,
        stop: i32,
    ) {
        debug_assert!(start <= stop && start >= 0 && stop < self.vp.width);
        let level = self.level;
        let bank = self.bank;
        let view = self.view;

        let seg = &level.segs[seg_id];
        let side = &level.sidedefs[seg.sidedef as usize];
        let line = &level.linedefs[seg.linedef as usize];
        let front = &level.sectors[front_id as usize];
        let back = seg.back_sector.map(|b| &level.sectors[b as usize]);

        let n = self.st.drawsegs.len() + 1;
        self.st
            .check_capacity(Overflow::DRAWSEGS, "drawsegs", n, MAXDRAWSEGS);

        /*──── distance and scale ────*/
        let normal = seg.angle.wrapping_add(ANG90);
        let offsetangle = (normal.wrapping_sub(angle1) as i32).unsigned_abs().min(ANG90);
        let v1 = level.vertices[seg.v1 as usize];
        let hyp = point_to_dist(v1.x.wrapping_sub(view.x), v1.y.wrapping_sub(view.y));
        let distance = fixed_mul(hyp, finesine(fine(ANG90 - offsetangle)));

        let mut w = WallRange {
            start,
            stop,
            distance,
            ..Default::default()
        };
        w.scale = self.scale_at(start, normal, distance);
        let scale2 = if stop > start {
            let s2 = self.scale_at(stop, normal, distance);
            w.scalestep = (s2 - w.scale) / (stop - start);
            s2
        } else {
            w.scale
        };

        let mut ds = DrawSeg {
            seg: seg_id,
            x1: start,
            x2: stop,
            scale1: w.scale,
            scale2,
            scalestep: w.scalestep,
            silhouette: Silhouette::empty(),
            bsilheight: 0,
            tsilheight: 0,
            sprtopclip: SpriteClip::None,
            sprbottomclip: SpriteClip::None,
            maskedtexturecol: None,
        };

        /*──── textures, pegging and plane marks ────*/
        let mut worldtop = front.ceiling_height.wrapping_sub(view.z);
        let mut worldbottom = front.floor_height.wrapping_sub(view.z);
        let mut worldhigh = 0;
        let mut worldlow = 0;
        let tex_height = |t: &Texture| (t.height as i32) << FRACBITS;

        match back {
            None => {
                let mid = bank.texture_or_missing(side.mid.unwrap_or(NO_TEXTURE));
                w.mid = Some(mid);
                w.markfloor = true;
                w.markceiling = true;
                w.midtexturemid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                    front.floor_height.wrapping_add(tex_height(mid)).wrapping_sub(view.z)
                } else {
                    worldtop
                };
                w.midtexturemid = w.midtexturemid.wrapping_add(side.row_offset);

                ds.silhouette = Silhouette::SOLID;
                ds.sprtopclip = SpriteClip::Closed;
                ds.sprbottomclip = SpriteClip::Closed;
                ds.bsilheight = i32::MAX;
                ds.tsilheight = i32::MIN;
            }
            Some(back) => {
                if front.floor_height > back.floor_height {
                    ds.silhouette = Silhouette::BOTTOM;
                    ds.bsilheight = front.floor_height;
                } else if back.floor_height > view.z {
                    ds.silhouette = Silhouette::BOTTOM;
                    ds.bsilheight = i32::MAX;
                }
                if front.ceiling_height < back.ceiling_height {
                    ds.silhouette |= Silhouette::TOP;
                    ds.tsilheight = front.ceiling_height;
                } else if back.ceiling_height < view.z {
                    ds.silhouette |= Silhouette::TOP;
                    ds.tsilheight = i32::MIN;
                }
                // closed door
                if back.ceiling_height <= front.floor_height {
                    ds.sprbottomclip = SpriteClip::Closed;
                    ds.bsilheight = i32::MAX;
                    ds.silhouette |= Silhouette::BOTTOM;
                }
                if back.floor_height >= front.ceiling_height {
                    ds.sprtopclip = SpriteClip::Closed;
                    ds.tsilheight = i32::MIN;
                    ds.silhouette |= Silhouette::TOP;
                }

                worldhigh = back.ceiling_height.wrapping_sub(view.z);
                worldlow = back.floor_height.wrapping_sub(view.z);

                // sky to sky: no upper wall, the sky shows through
                if bank.is_sky(front.ceiling_pic) && bank.is_sky(back.ceiling_pic) {
                    worldtop = worldhigh;
                }

                w.markfloor = worldlow != worldbottom
                    || back.floor_pic != front.floor_pic
                    || back.light != front.light;
                w.markceiling = worldhigh != worldtop
                    || back.ceiling_pic != front.ceiling_pic
                    || back.light != front.light;
                if back.ceiling_height <= front.floor_height || back.floor_height >= front.ceiling_height {
                    w.markceiling = true;
                    w.markfloor = true;
                }

                if worldhigh < worldtop {
                    w.top = side.top.map(|t| bank.texture_or_missing(t));
                    w.toptexturemid = if line.flags.contains(LinedefFlags::UPPER_UNPEGGED) {
                        worldtop
                    } else {
                        let h = w.top.map_or(0, tex_height);
                        back.ceiling_height.wrapping_add(h).wrapping_sub(view.z)
                    };
                }
                if worldlow > worldbottom {
                    w.bottom = side.bottom.map(|t| bank.texture_or_missing(t));
                    w.bottomtexturemid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                        worldtop
                    } else {
                        worldlow
                    };
                }
                w.toptexturemid = w.toptexturemid.wrapping_add(side.row_offset);
                w.bottomtexturemid = w.bottomtexturemid.wrapping_add(side.row_offset);

                if let Some(mid) = side.mid {
                    let cols = self.st.openings.alloc((stop - start + 1) as usize);
                    ds.maskedtexturecol = Some(cols.start);
                    w.masked = Some((cols.start, bank.texture_or_missing(mid)));
                }
            }
        }

        w.segtextured = w.mid.is_some() || w.top.is_some() || w.bottom.is_some() || w.masked.is_some();
        if w.segtextured {
            let diff = normal.wrapping_sub(angle1);
            let offsetangle = (if diff > ANG180 { diff.wrapping_neg() } else { diff }).min(ANG90);
            let mut offset = fixed_mul(hyp, finesine(fine(offsetangle)));
            if diff < ANG180 {
                offset = offset.wrapping_neg();
            }
            w.offset = offset.wrapping_add(side.texture_offset).wrapping_add(seg.offset);
            w.centerangle = ANG90.wrapping_add(view.angle).wrapping_sub(normal);
            w.light = self.seg_light(seg, front.light);
        }

        // planes on the far side of the eye are never visible
        if front.floor_height >= view.z {
            w.markfloor = false;
        }
        if front.ceiling_height <= view.z && !bank.is_sky(front.ceiling_pic) {
            w.markceiling = false;
        }

        /*──── edge steppers at HEIGHTBITS precision ────*/
        worldtop >>= 4;
        worldbottom >>= 4;
        let cy = view.centeryfrac >> 4;
        w.topstep = fixed_mul(w.scalestep, worldtop).wrapping_neg();
        w.topfrac = cy.wrapping_sub(fixed_mul(worldtop, w.scale));
        w.bottomstep = fixed_mul(w.scalestep, worldbottom).wrapping_neg();
        w.bottomfrac = cy.wrapping_sub(fixed_mul(worldbottom, w.scale));

        if back.is_some() {
            worldhigh >>= 4;
            worldlow >>= 4;
            if worldhigh < worldtop {
                w.pixhigh = cy.wrapping_sub(fixed_mul(worldhigh, w.scale));
                w.pixhighstep = fixed_mul(w.scalestep, worldhigh).wrapping_neg();
            }
            if worldlow > worldbottom {
                w.pixlow = cy.wrapping_sub(fixed_mul(worldlow, w.scale));
                w.pixlowstep = fixed_mul(w.scalestep, worldlow).wrapping_neg();
            }
        }

        if w.markceiling {
            match self.ceilingplane {
                Some(id) => self.ceilingplane = Some(self.check_plane(id, start, stop)),
                None => w.markceiling = false,
            }
        }
        if w.markfloor {
            match self.floorplane {
                Some(id) => self.floorplane = Some(self.check_plane(id, start, stop)),
                None => w.markfloor = false,
            }
        }

        self.render_seg_loop(&mut w);

        /*──── save sprite clipping info ────*/
        let masked = w.masked.is_some();
        let count = (stop - start + 1) as usize;
        if (ds.silhouette.contains(Silhouette::TOP) || masked) && ds.sprtopclip == SpriteClip::None {
            let r = self.st.openings.alloc(count);
            for (i, x) in (start..=stop).enumerate() {
                self.st.openings[r.start + i] = self.st.ceilingclip[x as usize];
            }
            ds.sprtopclip = SpriteClip::Saved(r.start);
        }
        if (ds.silhouette.contains(Silhouette::BOTTOM) || masked) && ds.sprbottomclip == SpriteClip::None {
            let r = self.st.openings.alloc(count);
            for (i, x) in (start..=stop).enumerate() {
                self.st.openings[r.start + i] = self.st.floorclip[x as usize];
            }
            ds.sprbottomclip = SpriteClip::Saved(r.start);
        }
        if masked && !ds.silhouette.contains(Silhouette::TOP) {
            ds.silhouette |= Silhouette::TOP;
            ds.tsilheight = i32::MIN;
        }
        if masked && !ds.silhouette.contains(Silhouette::BOTTOM) {
            ds.silhouette |= Silhouette::BOTTOM;
            ds.bsilheight = i32::MAX;
        }

        self.st.drawsegs.push(ds);

        let used = self.st.openings.used();
        let cap = self.vp.width as usize * OPENINGS_PER_COLUMN;
        self.st
            .check_capacity(Overflow::OPENINGS, "openings", used, cap);
    }

    fn render_seg_loop(&mut self, w: &mut WallRange<'f>) {
        let vp = self.vp;
        for x in w.start..=w.stop {
            let xi = x as usize;
            let cclip = self.st.ceilingclip[xi] as i32;
            let fclip = self.st.floorclip[xi] as i32;

            let yl = ((w.topfrac + HEIGHTUNIT - 1) >> HEIGHTBITS).max(cclip + 1);
            if w.markceiling {
                let top = cclip + 1;
                let bottom = (yl - 1).min(fclip - 1);
                if top <= bottom {
                    if let Some(id) = self.ceilingplane {
                        self.st.planes.get_mut(id).set(x, top, bottom);
                    }
                }
            }

            let yh = (w.bottomfrac >> HEIGHTBITS).min(fclip - 1);
            if w.markfloor {
                let top = (yh + 1).max(cclip + 1);
                let bottom = fclip - 1;
                if top <= bottom {
                    if let Some(id) = self.floorplane {
                        self.st.planes.get_mut(id).set(x, top, bottom);
                    }
                }
            }

            let mut texturecolumn = 0;
            let mut iscale = 0;
            let mut colormap = self.colormap(0);
            if w.segtextured {
                let angle = fine(w.centerangle.wrapping_add(vp.xtoviewangle[xi])) & (FINEANGLES / 2 - 1);
                texturecolumn = w
                    .offset
                    .wrapping_sub(fixed_mul(finetangent(angle), w.distance))
                    >> FRACBITS;
                colormap = self.scale_colormap(w.light, w.scale);
                iscale = (0xffff_ffffu32 / (w.scale.max(1) as u32)) as i32;
            }
            let col = WallColumn {
                x,
                texturecolumn,
                iscale,
                colormap,
            };

            if let Some(mid) = w.mid {
                self.wall_column(&col, yl, yh, mid, w.midtexturemid);
                self.st.ceilingclip[xi] = vp.height as i16;
                self.st.floorclip[xi] = -1;
            } else {
                if let Some(top) = w.top {
                    let mid = (w.pixhigh >> HEIGHTBITS).min(fclip - 1);
                    w.pixhigh = w.pixhigh.wrapping_add(w.pixhighstep);
                    if mid >= yl {
                        self.wall_column(&col, yl, mid, top, w.toptexturemid);
                        self.st.ceilingclip[xi] = mid as i16;
                    } else {
                        self.st.ceilingclip[xi] = (yl - 1) as i16;
                    }
                } else if w.markceiling {
                    self.st.ceilingclip[xi] = (yl - 1) as i16;
                }

                if let Some(bottom) = w.bottom {
                    let cclip = self.st.ceilingclip[xi] as i32;
                    let mid = ((w.pixlow + HEIGHTUNIT - 1) >> HEIGHTBITS).max(cclip + 1);
                    w.pixlow = w.pixlow.wrapping_add(w.pixlowstep);
                    if mid <= yh {
                        self.wall_column(&col, mid, yh, bottom, w.bottomtexturemid);
                        self.st.floorclip[xi] = mid as i16;
                    } else {
                        self.st.floorclip[xi] = (yh + 1) as i16;
                    }
                } else if w.markfloor {
                    self.st.floorclip[xi] = (yh + 1) as i16;
                }

                if let Some((base, tex)) = w.masked {
                    let wrapped = texturecolumn.rem_euclid(tex.width as i32);
                    self.st.openings[base + (x - w.start) as usize] = wrapped as i16;
                }
            }

            w.scale = w.scale.wrapping_add(w.scalestep);
            w.topfrac = w.topfrac.wrapping_add(w.topstep);
            w.bottomfrac = w.bottomfrac.wrapping_add(w.bottomstep);
        }
    }

    fn wall_column(&mut self, col: &WallColumn<'f>, yl: i32, yh: i32, tex: &Texture, texturemid: Fixed) {
        let dc = ColumnDrawContext {
            x: col.x,
            yl,
            yh,
            iscale: col.iscale,
            texturemid,
            centery: self.view.centery,
            source: tex.column(col.texturecolumn),
            mask: tex.height_mask(),
            colormap: col.colormap,
            translation: None,
            color: 0,
        };
        self.target
            .column(&dc, ColumnKind::Plain, &self.tables, &mut self.st.fuzz);
        self.st.wall_columns += 1;
    }

    /// Draw the still-pending masked mid texture columns `x1..=x2` of
    /// drawseg `index`.
    pub(super) fn render_masked_seg_range(&mut self, index: usize, x1: i32, x2: i32) {
        let ds = self.st.drawsegs[index];
        let Some(base) = ds.maskedtexturecol else {
            return;
        };
        let level = self.level;
        let seg = &level.segs[ds.seg];
        let Some(back_id) = seg.back_sector else {
            return;
        };
        let side = &level.sidedefs[seg.sidedef as usize];
        let Some(mid) = side.mid else {
            return;
        };
        let bank = self.bank;
        let tex = bank.texture_or_missing(mid);
        let line = &level.linedefs[seg.linedef as usize];
        let front = &level.sectors[seg.front_sector as usize];
        let back = &level.sectors[back_id as usize];
        let light = self.seg_light(seg, front.light);

        let base_mid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
            let h = (tex.height as i32) << FRACBITS;
            front.floor_height.max(back.floor_height).wrapping_add(h).wrapping_sub(self.view.z)
        } else {
            front.ceiling_height.min(back.ceiling_height).wrapping_sub(self.view.z)
        };
        let texturemid = base_mid.wrapping_add(side.row_offset);

        let height = self.vp.height;
        let mut spryscale = ds
            .scale1
            .wrapping_add((x1 - ds.x1).wrapping_mul(ds.scalestep));
        for x in x1..=x2 {
            let slot = base + (x - ds.x1) as usize;
            let texturecolumn = self.st.openings[slot];
            if texturecolumn != MASKED_DONE {
                let scale = spryscale.max(1);
                let col = MaskedColumn {
                    x,
                    texturecolumn: texturecolumn as i32,
                    iscale: (0xffff_ffffu32 / scale as u32) as i32,
                    colormap: self.scale_colormap(light, scale),
                    texturemid,
                    scale,
                    topscreen: self.view.centeryfrac.wrapping_sub(fixed_mul(texturemid, scale)),
                    kind: ColumnKind::Plain,
                    translation: None,
                };
                let ceil = ds.top_clip(&self.st.openings, x, height).unwrap_or(-1);
                let floor = ds.bottom_clip(&self.st.openings, x).unwrap_or(height as i16);
                self.draw_masked_column(&col, tex, ceil as i32, floor as i32);
                self.st.openings[slot] = MASKED_DONE;
            }
            spryscale = spryscale.wrapping_add(ds.scalestep);
        }
    }
}
