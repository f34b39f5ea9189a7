//! The masked pass: sprites for things, clipped against the drawsegs in
//! front of them, and the see-through mid textures of two-sided lines.

use super::{MAXVISSPRITES, Overflow, RenderPass, segs::Silhouette};
use crate::{
    draw::{ColumnDrawContext, ColumnKind},
    fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul},
    view::lights::LightTables,
    world::{SectorId, Texture, TextureId, ThingFlags, ThingId},
};

/// Things nearer than this to the view plane are not drawn.
pub const MINZ: Fixed = 4 * FRACUNIT;

/// Clip sentinel: no drawseg has claimed this column yet.
const UNCLIPPED: i16 = -2;

/// A thing projected to the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisSprite {
    pub thing: ThingId,
    /// Inclusive, already clipped to the view.
    pub x1: i32,
    pub x2: i32,
    /// World position, for the seg side test.
    pub gx: Fixed,
    pub gy: Fixed,
    /// Bottom and top in world z.
    pub gz: Fixed,
    pub gzt: Fixed,
    /// Vertical scale, same metric as wall scales.
    pub scale: Fixed,
    /// Patch column step per screen column; negative when flipped.
    pub xiscale: Fixed,
    pub startfrac: Fixed,
    pub texturemid: Fixed,
    pub patch: TextureId,
    pub kind: ColumnKind,
    pub colormap: u8,
    pub translation: u8,
}

/// One screen column of a masked picture.
pub(super) struct MaskedColumn<'t> {
    pub x: i32,
    pub texturecolumn: i32,
    pub iscale: Fixed,
    pub colormap: &'t [u8; 256],
    pub texturemid: Fixed,
    pub scale: Fixed,
    /// Screen y of the picture's top row, 16.16.
    pub topscreen: Fixed,
    pub kind: ColumnKind,
    pub translation: Option<&'t [u8; 256]>,
}

fn column_kind(flags: ThingFlags, translated: bool) -> ColumnKind {
    if flags.contains(ThingFlags::SHADOW) {
        return ColumnKind::Fuzz;
    }
    match (flags.contains(ThingFlags::TRANSLUCENT), translated) {
        (false, false) => ColumnKind::Plain,
        (false, true) => ColumnKind::Translated,
        (true, false) => ColumnKind::Translucent,
        (true, true) => ColumnKind::TranslatedTranslucent,
    }
}

impl<'f> RenderPass<'f> {
    /// Project the things of `sector`, once per frame.
    pub(super) fn add_sprites(&mut self, sector: SectorId) {
        if !self.st.mark_sector(sector) {
            return;
        }
        let level = self.level;
        let sec = &level.sectors[sector as usize];
        let light = LightTables::level(sec.light, self.view.extralight);
        for &id in &sec.things {
            self.project_sprite(id, light);
        }
    }

    fn project_sprite(&mut self, id: ThingId, light: usize) {
        let level = self.level;
        let bank = self.bank;
        let view = self.view;
        let Some(thing) = level.things.get(id as usize) else {
            return;
        };

        let tr_x = thing.x.wrapping_sub(view.x);
        let tr_y = thing.y.wrapping_sub(view.y);

        // depth along the view direction
        let tz = fixed_mul(tr_x, view.cos).wrapping_add(fixed_mul(tr_y, view.sin));
        if tz < MINZ {
            return;
        }
        let xscale = fixed_div(view.projection, tz);

        // sideways offset, positive to the left
        let mut tx = fixed_mul(tr_x, view.sin).wrapping_sub(fixed_mul(tr_y, view.cos));
        if (tx as i64).abs() > (tz as i64) << 2 {
            return;
        }

        let patch = bank.texture_or_missing(thing.sprite);
        let width = (patch.width as i32) << FRACBITS;

        tx = tx.wrapping_sub(patch.left_offset << FRACBITS);
        let x1 = (view.centerxfrac.wrapping_add(fixed_mul(tx, xscale))) >> FRACBITS;
        if x1 >= self.vp.width {
            return;
        }
        tx = tx.wrapping_add(width);
        let x2 = ((view.centerxfrac.wrapping_add(fixed_mul(tx, xscale))) >> FRACBITS) - 1;
        if x2 < 0 {
            return;
        }

        let gz = thing
            .z
            .unwrap_or_else(|| level.sectors[thing.sector as usize].floor_height);
        let gzt = gz.wrapping_add(patch.top_offset << FRACBITS);

        let vis_x1 = x1.max(0);
        let vis_x2 = x2.min(self.vp.width - 1);
        let iscale = fixed_div(FRACUNIT, xscale);
        let (mut startfrac, xiscale) = if thing.flags.contains(ThingFlags::FLIP) {
            (width - 1, -iscale)
        } else {
            (0, iscale)
        };
        if vis_x1 > x1 {
            startfrac = startfrac.wrapping_add(xiscale.wrapping_mul(vis_x1 - x1));
        }

        let colormap = match view.fixed_colormap {
            Some(c) => c,
            None if thing.flags.contains(ThingFlags::FULLBRIGHT) => 0,
            None => self.vp.scale_light(light, xscale),
        };

        let translated = bank.translations().get(thing.translation).is_some();
        self.st.sprites.push(VisSprite {
            thing: id,
            x1: vis_x1,
            x2: vis_x2,
            gx: thing.x,
            gy: thing.y,
            gz,
            gzt,
            scale: fixed_div(view.projection_y, tz),
            xiscale,
            startfrac,
            texturemid: gzt.wrapping_sub(view.z),
            patch: thing.sprite,
            kind: column_kind(thing.flags, translated),
            colormap,
            translation: thing.translation,
        });

        let n = self.st.sprites.len();
        self.st
            .check_capacity(Overflow::VISSPRITES, "vissprites", n, MAXVISSPRITES);
    }

    /// Sprites back to front, then whatever masked mid textures no sprite
    /// pulled forward.
    pub(super) fn draw_masked(&mut self) {
        self.st.sprites.sort_by_key(|s| s.scale);

        for i in 0..self.st.sprites.len() {
            let spr = self.st.sprites[i];
            self.draw_sprite(&spr);
        }

        for i in (0..self.st.drawsegs.len()).rev() {
            let ds = self.st.drawsegs[i];
            if ds.maskedtexturecol.is_some() {
                self.render_masked_seg_range(i, ds.x1, ds.x2);
            }
        }
    }

    fn draw_sprite(&mut self, spr: &VisSprite) {
        let level = self.level;
        let height = self.vp.height;
        if spr.x1 > spr.x2 {
            return;
        }
        for x in spr.x1..=spr.x2 {
            self.st.clipbot[x as usize] = UNCLIPPED;
            self.st.cliptop[x as usize] = UNCLIPPED;
        }

        // nearest drawsegs were stored last
        for i in (0..self.st.drawsegs.len()).rev() {
            let ds = self.st.drawsegs[i];
            if ds.x1 > spr.x2
                || ds.x2 < spr.x1
                || (ds.silhouette.is_empty() && ds.maskedtexturecol.is_none())
            {
                continue;
            }

            let r1 = ds.x1.max(spr.x1);
            let r2 = ds.x2.min(spr.x2);
            let (lowscale, scale) = if ds.scale1 > ds.scale2 {
                (ds.scale2, ds.scale1)
            } else {
                (ds.scale1, ds.scale2)
            };

            if scale < spr.scale
                || (lowscale < spr.scale
                    && level.point_on_seg_side(spr.gx, spr.gy, &level.segs[ds.seg]) == 0)
            {
                // wall is behind the sprite; its masked part goes first
                if ds.maskedtexturecol.is_some() {
                    self.render_masked_seg_range(i, r1, r2);
                }
                continue;
            }

            let mut sil = ds.silhouette;
            if spr.gz >= ds.bsilheight {
                sil.remove(Silhouette::BOTTOM);
            }
            if spr.gzt <= ds.tsilheight {
                sil.remove(Silhouette::TOP);
            }

            for x in r1..=r2 {
                let xi = x as usize;
                if sil.contains(Silhouette::BOTTOM) && self.st.clipbot[xi] == UNCLIPPED {
                    if let Some(c) = ds.bottom_clip(&self.st.openings, x) {
                        self.st.clipbot[xi] = c;
                    }
                }
                if sil.contains(Silhouette::TOP) && self.st.cliptop[xi] == UNCLIPPED {
                    if let Some(c) = ds.top_clip(&self.st.openings, x, height) {
                        self.st.cliptop[xi] = c;
                    }
                }
            }
        }

        for x in spr.x1..=spr.x2 {
            let xi = x as usize;
            if self.st.clipbot[xi] == UNCLIPPED {
                self.st.clipbot[xi] = height as i16;
            }
            if self.st.cliptop[xi] == UNCLIPPED {
                self.st.cliptop[xi] = -1;
            }
        }

        self.draw_vis_sprite(spr);
    }

    fn draw_vis_sprite(&mut self, spr: &VisSprite) {
        let bank = self.bank;
        let patch = bank.texture_or_missing(spr.patch);
        let colormap = self.colormap(spr.colormap);
        let translation = bank.translations().get(spr.translation);
        let iscale = fixed_div(FRACUNIT, spr.scale.max(1));
        let topscreen = self
            .view
            .centeryfrac
            .wrapping_sub(fixed_mul(spr.texturemid, spr.scale));
        let last = patch.width as i32 - 1;

        let mut frac = spr.startfrac;
        for x in spr.x1..=spr.x2 {
            let col = MaskedColumn {
                x,
                texturecolumn: (frac >> FRACBITS).clamp(0, last),
                iscale,
                colormap,
                texturemid: spr.texturemid,
                scale: spr.scale,
                topscreen,
                kind: spr.kind,
                translation,
            };
            let ceil = self.st.cliptop[x as usize] as i32;
            let floor = self.st.clipbot[x as usize] as i32;
            self.draw_masked_column(&col, patch, ceil, floor);
            frac = frac.wrapping_add(spr.xiscale);
        }
    }

    /// Draw the posts of one picture column between the clip rows
    /// `ceil` and `floor` (both exclusive).
    pub(super) fn draw_masked_column(&mut self, col: &MaskedColumn<'f>, tex: &Texture, ceil: i32, floor: i32) {
        let source = tex.column(col.texturecolumn);
        for post in tex.posts(col.texturecolumn) {
            let topscreen = col.topscreen as i64 + col.scale as i64 * post.top as i64;
            let bottomscreen = topscreen + col.scale as i64 * post.len as i64;
            let yl = ((topscreen + FRACUNIT as i64 - 1) >> FRACBITS).max(ceil as i64 + 1);
            let yh = ((bottomscreen - 1) >> FRACBITS).min(floor as i64 - 1);
            if yl > yh {
                continue;
            }
            let dc = ColumnDrawContext {
                x: col.x,
                yl: yl as i32,
                yh: yh as i32,
                iscale: col.iscale,
                texturemid: col.texturemid,
                centery: self.view.centery,
                source,
                mask: tex.height_mask(),
                colormap: col.colormap,
                translation: col.translation,
                color: 0,
            };
            self.target
                .column(&dc, col.kind, &self.tables, &mut self.st.fuzz);
        }
    }
}
