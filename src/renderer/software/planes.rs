//! Floors and ceilings: visplane collection during the walk, span
//! rasterization after it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::{MAXVISPLANES, Overflow, RenderPass};
use crate::{
    draw::{ColumnDrawContext, ColumnKind, SpanDrawContext},
    fixed::{ANG90, FRACUNIT, Fixed, fine, finecosine, finesine, fixed_div, fixed_mul},
    view::lights::{LIGHTZSHIFT, LightTables, MAXLIGHTZ},
    world::FlatId,
};

pub type VisplaneId = usize;

/// `top` of a column the plane does not cover.
pub const UNUSED: u16 = u16::MAX;

/// Sky columns: one texture column per 4M of view angle.
const ANGLETOSKYSHIFT: u32 = 22;
/// Texture row of the sky at the horizon.
const SKY_TEXTUREMID: Fixed = 100 * FRACUNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneKey {
    pub height: Fixed,
    pub picnum: FlatId,
    pub light: i16,
}

#[derive(Clone, Debug)]
pub struct Visplane {
    pub key: PlaneKey,
    /// Inclusive horizontal range the plane touches; empty while
    /// `minx > maxx`.
    pub minx: i32,
    pub maxx: i32,
    /// Indexed by `x + 1`: the spare slot either side is the span sentinel.
    top: Vec<u16>,
    bottom: Vec<u16>,
}

impl Visplane {
    fn new(key: PlaneKey, width: i32, minx: i32, maxx: i32) -> Self {
        let mut pl = Self {
            key,
            minx,
            maxx,
            top: Vec::new(),
            bottom: Vec::new(),
        };
        pl.reset(key, width, minx, maxx);
        pl
    }

    fn reset(&mut self, key: PlaneKey, width: i32, minx: i32, maxx: i32) {
        let slots = width as usize + 2;
        self.key = key;
        self.minx = minx;
        self.maxx = maxx;
        self.top.clear();
        self.top.resize(slots, UNUSED);
        self.bottom.clear();
        self.bottom.resize(slots, 0);
    }

    #[inline]
    pub fn top(&self, x: i32) -> u16 {
        self.top[(x + 1) as usize]
    }

    #[inline]
    pub fn bottom(&self, x: i32) -> u16 {
        self.bottom[(x + 1) as usize]
    }

    #[inline]
    pub fn is_used(&self, x: i32) -> bool {
        self.top(x) != UNUSED
    }

    #[inline]
    pub fn set(&mut self, x: i32, top: i32, bottom: i32) {
        debug_assert!(top <= bottom && top >= 0);
        self.top[(x + 1) as usize] = top as u16;
        self.bottom[(x + 1) as usize] = bottom as u16;
    }

    /// Covered columns as `(x, top, bottom)`.
    pub fn columns(&self) -> impl Iterator<Item = (i32, u16, u16)> + '_ {
        (self.minx..=self.maxx)
            .filter(|&x| self.is_used(x))
            .map(|x| (x, self.top(x), self.bottom(x)))
    }
}

/// Visplanes of one frame. Planes are kept across frames and reset in
/// place; `active` counts the ones in use.
#[derive(Default, Debug)]
pub struct PlaneSet {
    map: HashMap<PlaneKey, Vec<VisplaneId>>,
    planes: Vec<Visplane>,
    active: usize,
    width: i32,
}

impl PlaneSet {
    pub fn clear(&mut self, width: i32) {
        self.map.clear();
        self.active = 0;
        self.width = width;
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn planes(&self) -> &[Visplane] {
        &self.planes[..self.active]
    }

    #[inline]
    pub fn get(&self, id: VisplaneId) -> &Visplane {
        &self.planes[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: VisplaneId) -> &mut Visplane {
        &mut self.planes[id]
    }

    fn open(&mut self, key: PlaneKey, minx: i32, maxx: i32) -> VisplaneId {
        let id = self.active;
        match self.planes.get_mut(id) {
            Some(pl) => pl.reset(key, self.width, minx, maxx),
            None => self.planes.push(Visplane::new(key, self.width, minx, maxx)),
        }
        self.active += 1;

        let ids = match self.map.entry(key) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => v.insert(Vec::new()),
        };
        ids.push(id);
        id
    }

    /// Latest plane with `key`, or a new one covering nothing yet.
    pub fn find(&mut self, key: PlaneKey) -> VisplaneId {
        if let Some(&id) = self.map.get(&key).and_then(|ids| ids.last()) {
            return id;
        }
        self.open(key, self.width, -1)
    }

    /// Widen plane `id` to `start..=stop` if none of the overlapping
    /// columns are taken; otherwise open a new plane with the same key.
    pub fn check(&mut self, id: VisplaneId, start: i32, stop: i32) -> VisplaneId {
        let pl = &mut self.planes[id];
        let (intrl, unionl) = if start < pl.minx { (pl.minx, start) } else { (start, pl.minx) };
        let (intrh, unionh) = if stop > pl.maxx { (pl.maxx, stop) } else { (stop, pl.maxx) };

        if (intrl..=intrh).all(|x| !pl.is_used(x)) {
            pl.minx = unionl;
            pl.maxx = unionh;
            return id;
        }

        let key = pl.key;
        self.open(key, start, stop)
    }
}

/// Per-row span parameters, valid while the plane height is unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct RowCache {
    height: Fixed,
    distance: Fixed,
    xstep: Fixed,
    ystep: Fixed,
}

/// What `map_plane` needs from the plane being drawn.
struct FlatSpans<'a> {
    source: &'a [u8],
    height: Fixed,
    light: usize,
    basexscale: Fixed,
    baseyscale: Fixed,
}

impl RenderPass<'_> {
    /// Plane for a sector surface; every sky surface shares one key.
    pub(super) fn find_plane(&mut self, height: Fixed, picnum: FlatId, light: i16) -> VisplaneId {
        let key = if self.bank.is_sky(picnum) {
            PlaneKey {
                height: 0,
                picnum,
                light: 0,
            }
        } else {
            PlaneKey {
                height,
                picnum,
                light,
            }
        };
        let id = self.st.planes.find(key);
        self.count_planes();
        id
    }

    pub(super) fn check_plane(&mut self, id: VisplaneId, start: i32, stop: i32) -> VisplaneId {
        let id = self.st.planes.check(id, start, stop);
        self.count_planes();
        id
    }

    fn count_planes(&mut self) {
        let n = self.st.planes.len();
        self.st
            .check_capacity(Overflow::VISPLANES, "visplanes", n, MAXVISPLANES);
    }

    /// Rasterize every collected plane.
    pub(super) fn draw_planes(&mut self) {
        let angle = fine(self.view.angle.wrapping_sub(ANG90));
        let basexscale = fixed_div(finecosine(angle), self.vp.focal_x);
        let baseyscale = fixed_div(finesine(angle), self.vp.focal_x).wrapping_neg();

        for id in 0..self.st.planes.len() {
            let pl = self.st.planes.get(id);
            if pl.minx > pl.maxx {
                continue;
            }
            let key = pl.key;

            let bank = self.bank;
            if bank.is_sky(key.picnum) {
                self.draw_sky(id);
                continue;
            }

            let flat = bank.flat(key.picnum);
            let spans = FlatSpans {
                source: &flat.pixels[..],
                height: key.height.wrapping_sub(self.view.z).wrapping_abs(),
                light: LightTables::level(key.light, self.view.extralight),
                basexscale,
                baseyscale,
            };

            let (minx, maxx) = (pl.minx, pl.maxx);
            for x in minx..=maxx + 1 {
                let pl = self.st.planes.get(id);
                let (t1, b1) = (pl.top(x - 1) as i32, pl.bottom(x - 1) as i32);
                let (t2, b2) = (pl.top(x) as i32, pl.bottom(x) as i32);
                self.make_spans(x, t1, b1, t2, b2, &spans);
            }
        }
    }

    /// Close the rows that ended at column `x - 1`, open the ones that
    /// start at `x`.
    fn make_spans(&mut self, x: i32, mut t1: i32, mut b1: i32, mut t2: i32, mut b2: i32, p: &FlatSpans) {
        while t1 < t2 && t1 <= b1 {
            let start = self.st.spanstart[t1 as usize];
            self.map_plane(t1, start, x - 1, p);
            t1 += 1;
        }
        while b1 > b2 && b1 >= t1 {
            let start = self.st.spanstart[b1 as usize];
            self.map_plane(b1, start, x - 1, p);
            b1 -= 1;
        }
        while t2 < t1 && t2 <= b2 {
            self.st.spanstart[t2 as usize] = x;
            t2 += 1;
        }
        while b2 > b1 && b2 >= t2 {
            self.st.spanstart[b2 as usize] = x;
            b2 -= 1;
        }
    }

    fn map_plane(&mut self, y: i32, x1: i32, x2: i32, p: &FlatSpans) {
        debug_assert!(x1 <= x2 && x1 >= 0 && x2 < self.vp.width);

        let row = &mut self.st.rows[y as usize];
        if row.height != p.height {
            row.height = p.height;
            row.distance = fixed_mul(p.height, self.vp.yslope()[y as usize]);
            row.xstep = fixed_mul(row.distance, p.basexscale);
            row.ystep = fixed_mul(row.distance, p.baseyscale);
        }
        let RowCache {
            distance,
            xstep,
            ystep,
            ..
        } = *row;

        let length = fixed_mul(distance, self.vp.distscale[x1 as usize]);
        let angle = fine(self.view.angle.wrapping_add(self.vp.xtoviewangle[x1 as usize]));
        let xfrac = self.view.x.wrapping_add(fixed_mul(finecosine(angle), length));
        let yfrac = self
            .view
            .y
            .wrapping_neg()
            .wrapping_sub(fixed_mul(finesine(angle), length));

        let colormap = match self.view.fixed_colormap {
            Some(c) => self.colormap(c),
            None => {
                let idx = ((distance >> LIGHTZSHIFT).max(0) as usize).min(MAXLIGHTZ - 1);
                self.colormap(self.vp.lights.zlight[p.light][idx])
            }
        };

        let ds = SpanDrawContext {
            y,
            x1,
            x2,
            xfrac,
            yfrac,
            xstep,
            ystep,
            source: p.source,
            colormap,
        };
        self.target.span(&ds, &self.tables);
    }

    /// Sky columns ignore light and map view angle straight to a texture
    /// column.
    fn draw_sky(&mut self, id: VisplaneId) {
        let bank = self.bank;
        let tex = bank.texture_or_missing(bank.sky_texture());
        let colormap = self.colormap(0);
        let pl = self.st.planes.get(id);

        for x in pl.minx..=pl.maxx {
            let (top, bottom) = (pl.top(x), pl.bottom(x));
            if top == UNUSED || top > bottom {
                continue;
            }
            let angle = self.view.angle.wrapping_add(self.vp.xtoviewangle[x as usize]) >> ANGLETOSKYSHIFT;
            let dc = ColumnDrawContext {
                x,
                yl: top as i32,
                yh: bottom as i32,
                iscale: self.vp.sky_iscale,
                texturemid: SKY_TEXTUREMID,
                centery: self.view.centery,
                source: tex.column(angle as i32),
                mask: tex.height_mask(),
                colormap,
                translation: None,
                color: 0,
            };
            self.target
                .column(&dc, ColumnKind::Stretch, &self.tables, &mut self.st.fuzz);
        }
    }
}
