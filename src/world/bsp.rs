use crate::{
    fixed::{Fixed, fixed_mul},
    world::geometry::{Level, Node, Seg, SubsectorId},
};

/// Node child index flag: the low bits are a subsector, not a node.
pub const NF_SUBSECTOR: u16 = 0x8000;

pub const CHILD_MASK: u16 = 0x7FFF;

// ──────────────────────────────────────────────────────────────────────────
//                       Level – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl Level {
    /// Child index of the BSP root (`nodes.len()-1` in Doom); a level with
    /// no nodes is a single subsector.
    #[inline(always)]
    pub fn bsp_root(&self) -> u16 {
        match self.nodes.len() {
            0 => NF_SUBSECTOR,
            n => (n - 1) as u16,
        }
    }

    /// Walk the BSP and return the subsector id containing `(x, y)`.
    pub fn locate_subsector(&self, x: Fixed, y: Fixed) -> SubsectorId {
        let mut idx = self.bsp_root();
        while idx & NF_SUBSECTOR == 0 {
            let node = &self.nodes[idx as usize];
            idx = node.child[node.point_side(x, y)];
        }
        idx & CHILD_MASK
    }

    /// Side of `seg` the point lies on: 0 = front, 1 = back.
    pub fn point_on_seg_side(&self, x: Fixed, y: Fixed, seg: &Seg) -> usize {
        let v1 = self.vertices[seg.v1 as usize];
        let v2 = self.vertices[seg.v2 as usize];
        point_on_line_side(x, y, v1.x, v1.y, v2.x.wrapping_sub(v1.x), v2.y.wrapping_sub(v1.y))
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Node geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Node {
    /// 0 = *front* of splitter, 1 = *back*.
    #[inline(always)]
    pub fn point_side(&self, x: Fixed, y: Fixed) -> usize {
        point_on_line_side(x, y, self.x, self.y, self.dx, self.dy)
    }
}

/// Which side of the directed line `(lx, ly) + t·(ldx, ldy)` a point is on.
/// Points exactly on the line count as front.
pub fn point_on_line_side(x: Fixed, y: Fixed, lx: Fixed, ly: Fixed, ldx: Fixed, ldy: Fixed) -> usize {
    if ldx == 0 {
        return if x <= lx { (ldy > 0) as usize } else { (ldy < 0) as usize };
    }
    if ldy == 0 {
        return if y <= ly { (ldx < 0) as usize } else { (ldx > 0) as usize };
    }

    let dx = x.wrapping_sub(lx);
    let dy = y.wrapping_sub(ly);

    // differing signs decide without a multiply
    if (ldy ^ ldx ^ dx ^ dy) < 0 {
        return ((ldy ^ dx) < 0) as usize;
    }

    let left = fixed_mul(ldy >> 16, dx);
    let right = fixed_mul(dy, ldx >> 16);
    (right >= left) as usize
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;
    use crate::world::demo::LevelBuilder;

    fn node(x: i32, y: i32, dx: i32, dy: i32) -> Node {
        let b = crate::world::geometry::BBox {
            top: 0,
            bottom: 0,
            left: 0,
            right: 0,
        };
        Node {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            dx: dx * FRACUNIT,
            dy: dy * FRACUNIT,
            bbox: [b, b],
            child: [0, 0],
        }
    }

    #[test]
    fn axis_aligned_partitions() {
        // line pointing north: east is the front
        let n = node(0, 0, 0, 10);
        assert_eq!(n.point_side(5 * FRACUNIT, 3 * FRACUNIT), 0);
        assert_eq!(n.point_side(-5 * FRACUNIT, 3 * FRACUNIT), 1);
        // line pointing east: south is the front
        let n = node(0, 0, 10, 0);
        assert_eq!(n.point_side(0, -FRACUNIT), 0);
        assert_eq!(n.point_side(0, FRACUNIT), 1);
    }

    #[test]
    fn diagonal_partition_agrees_with_cross_product() {
        let n = node(0, 0, 10, 10);
        for (px, py) in [(5, -3), (-2, -9), (7, 1), (-4, 3), (1, 8), (-9, -2)] {
            let cross = (px * 10 - py * 10) as i64; // dy·px − dx·py
            let want = if cross > 0 { 0 } else { 1 };
            assert_eq!(n.point_side(px * FRACUNIT, py * FRACUNIT), want, "({px},{py})");
        }
    }

    #[test]
    fn locate_in_split_room() {
        let lvl = LevelBuilder::split_room(0, 32).build().unwrap();
        let west = lvl.locate_subsector(-64 * FRACUNIT, 0);
        let east = lvl.locate_subsector(64 * FRACUNIT, 0);
        assert_ne!(west, east);
        assert_ne!(
            lvl.subsectors[west as usize].sector,
            lvl.subsectors[east as usize].sector
        );
    }

    #[test]
    fn nodeless_level_is_one_subsector() {
        let lvl = LevelBuilder::single_room().build().unwrap();
        assert_eq!(lvl.bsp_root(), NF_SUBSECTOR);
        assert_eq!(lvl.locate_subsector(12345, -999), 0);
    }
}
