//! Front-to-back BSP walk: node bounding boxes are culled against the
//! solid columns, subsectors hand their segs to the wall code.

use smallvec::{SmallVec, smallvec};

use super::RenderPass;
use crate::{
    fixed::{ANG90, ANG180, Angle, Fixed, fine, point_to_angle},
    world::{
        BBox, SectorId, SubsectorId,
        bsp::{CHILD_MASK, NF_SUBSECTOR},
    },
};

/// Pending work on the walk stack.
#[derive(Clone, Copy, Debug)]
enum Visit {
    /// Node or subsector child index.
    Child(u16),
    /// Far side of a node, taken only if its box can still show.
    Far { node: u16, side: usize },
}

/// For each viewer position around a box (3×3, row-major from top-left),
/// the two corners that span it as seen from there: indices into
/// `[top, bottom, left, right]` as `x1, y1, x2, y2`.
const CHECKCOORD: [[usize; 4]; 11] = [
    [3, 0, 2, 1],
    [3, 0, 2, 0],
    [3, 1, 2, 0],
    [0; 4],
    [2, 0, 2, 1],
    [0; 4],
    [3, 1, 3, 0],
    [0; 4],
    [2, 0, 3, 1],
    [2, 1, 3, 1],
    [2, 1, 3, 0],
];

/// Silhouette corners of `bbox` seen from `(x, y)`; `None` when the
/// viewer is inside the box.
fn box_corners(bbox: &BBox, x: Fixed, y: Fixed) -> Option<[(Fixed, Fixed); 2]> {
    let boxx = if x <= bbox.left {
        0
    } else if x < bbox.right {
        1
    } else {
        2
    };
    let boxy = if y >= bbox.top {
        0
    } else if y > bbox.bottom {
        1
    } else {
        2
    };
    let boxpos = (boxy << 2) + boxx;
    if boxpos == 5 {
        return None;
    }
    let c = [bbox.top, bbox.bottom, bbox.left, bbox.right];
    let [x1, y1, x2, y2] = CHECKCOORD[boxpos];
    Some([(c[x1], c[y1]), (c[x2], c[y2])])
}

impl<'f> RenderPass<'f> {
    pub(super) fn render_bsp(&mut self) {
        let level = self.level;
        let mut stack: SmallVec<[Visit; 64]> = smallvec![Visit::Child(level.bsp_root())];

        while let Some(visit) = stack.pop() {
            if self.st.solid.is_full() {
                break;
            }
            match visit {
                Visit::Child(child) if child & NF_SUBSECTOR != 0 => {
                    self.subsector(child & CHILD_MASK);
                }
                Visit::Child(id) => {
                    let node = &level.nodes[id as usize];
                    let side = node.point_side(self.view.x, self.view.y);
                    stack.push(Visit::Far { node: id, side });
                    stack.push(Visit::Child(node.child[side]));
                }
                Visit::Far { node, side } => {
                    let node = &level.nodes[node as usize];
                    if self.check_bbox(&node.bbox[side ^ 1]) {
                        stack.push(Visit::Child(node.child[side ^ 1]));
                    }
                }
            }
        }
    }

    /// Clip a view-relative angle pair to the field of view and map it to
    /// screen columns. `None` if the pair is back-facing or off screen.
    fn angles_to_columns(&self, mut angle1: Angle, mut angle2: Angle) -> Option<(i32, i32)> {
        let clipangle = self.vp.clipangle;
        let clip2 = clipangle.wrapping_mul(2);

        let span = angle1.wrapping_sub(angle2);
        if span >= ANG180 {
            return None;
        }

        let tspan = angle1.wrapping_add(clipangle);
        if tspan > clip2 {
            if tspan - clip2 >= span {
                return None;
            }
            angle1 = clipangle;
        }
        let tspan = clipangle.wrapping_sub(angle2);
        if tspan > clip2 {
            if tspan - clip2 >= span {
                return None;
            }
            angle2 = clipangle.wrapping_neg();
        }

        let x1 = self.vp.viewangletox[fine(angle1.wrapping_add(ANG90))];
        let x2 = self.vp.viewangletox[fine(angle2.wrapping_add(ANG90))];
        Some((x1, x2))
    }

    #[inline]
    fn relative_angle(&self, x: Fixed, y: Fixed) -> Angle {
        point_to_angle(x.wrapping_sub(self.view.x), y.wrapping_sub(self.view.y))
    }

    /// `true` if some part of `bbox` may still be visible.
    fn check_bbox(&self, bbox: &BBox) -> bool {
        let Some([(x1, y1), (x2, y2)]) = box_corners(bbox, self.view.x, self.view.y) else {
            return true;
        };
        let angle1 = self.relative_angle(x1, y1).wrapping_sub(self.view.angle);
        let angle2 = self.relative_angle(x2, y2).wrapping_sub(self.view.angle);

        // viewer sits on an edge line of the box
        if angle1.wrapping_sub(angle2) >= ANG180 {
            return true;
        }
        match self.angles_to_columns(angle1, angle2) {
            Some((sx1, sx2)) if sx1 != sx2 => self.st.solid.is_visible(sx1, sx2 - 1),
            _ => false,
        }
    }

    fn subsector(&mut self, id: SubsectorId) {
        let level = self.level;
        let bank = self.bank;
        let ss = &level.subsectors[id as usize];
        let sec = &level.sectors[ss.sector as usize];
        self.st.visited.push(id);

        self.floorplane = if sec.floor_height < self.view.z {
            Some(self.find_plane(sec.floor_height, sec.floor_pic, sec.light))
        } else {
            None
        };
        self.ceilingplane = if sec.ceiling_height > self.view.z || bank.is_sky(sec.ceiling_pic) {
            Some(self.find_plane(sec.ceiling_height, sec.ceiling_pic, sec.light))
        } else {
            None
        };

        self.add_sprites(ss.sector);

        let first = ss.first_seg as usize;
        for seg_id in first..first + ss.seg_count as usize {
            self.add_line(seg_id, ss.sector);
        }
    }

    /// Clip one seg against the solid columns and store what shows.
    fn add_line(&mut self, seg_id: usize, front_id: SectorId) {
        let level = self.level;
        let seg = &level.segs[seg_id];
        let v1 = level.vertices[seg.v1 as usize];
        let v2 = level.vertices[seg.v2 as usize];

        let rw_angle1 = self.relative_angle(v1.x, v1.y);
        let angle1 = rw_angle1.wrapping_sub(self.view.angle);
        let angle2 = self.relative_angle(v2.x, v2.y).wrapping_sub(self.view.angle);

        let Some((x1, x2)) = self.angles_to_columns(angle1, angle2) else {
            return;
        };
        // no column centre between the ends
        if x1 == x2 {
            return;
        }

        let front = &level.sectors[front_id as usize];
        let side = &level.sidedefs[seg.sidedef as usize];
        let solid = match seg.back_sector.map(|b| &level.sectors[b as usize]) {
            None => true,
            Some(back) if back.ceiling_height <= front.floor_height
                || back.floor_height >= front.ceiling_height =>
            {
                true
            }
            Some(back) if back.ceiling_height != front.ceiling_height
                || back.floor_height != front.floor_height =>
            {
                false
            }
            Some(back) => {
                // identical on both sides: nothing to draw
                if back.ceiling_pic == front.ceiling_pic
                    && back.floor_pic == front.floor_pic
                    && back.light == front.light
                    && side.mid.is_none()
                {
                    return;
                }
                false
            }
        };

        let pieces = if solid {
            self.st.solid.clip_solid(x1, x2 - 1)
        } else {
            self.st.solid.clip_pass(x1, x2 - 1)
        };
        for piece in pieces {
            self.store_wall_range(seg_id, front_id, rw_angle1, piece.first, piece.last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::int_to_fixed;

    fn unit_box() -> BBox {
        BBox {
            top: int_to_fixed(64),
            bottom: int_to_fixed(0),
            left: int_to_fixed(0),
            right: int_to_fixed(64),
        }
    }

    #[test]
    fn inside_the_box_has_no_silhouette() {
        assert_eq!(box_corners(&unit_box(), int_to_fixed(32), int_to_fixed(32)), None);
    }

    #[test]
    fn silhouette_corners_from_each_side() {
        let b = unit_box();
        let (lo, hi) = (int_to_fixed(0), int_to_fixed(64));

        // west of the box: the west edge, left end first
        let west = box_corners(&b, int_to_fixed(-10), int_to_fixed(32));
        assert_eq!(west, Some([(lo, hi), (lo, lo)]));

        // south of the box: the south edge
        let south = box_corners(&b, int_to_fixed(32), int_to_fixed(-10));
        assert_eq!(south, Some([(lo, lo), (hi, lo)]));

        // north-west corner: the far diagonal
        let nw = box_corners(&b, int_to_fixed(-10), int_to_fixed(80));
        assert_eq!(nw, Some([(hi, hi), (lo, lo)]));
    }
}
