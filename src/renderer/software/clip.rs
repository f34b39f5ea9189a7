//! Horizontal occlusion: the sorted list of screen-column ranges already
//! covered by solid walls.

use smallvec::SmallVec;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct ClipRange {
    pub first: i32,
    pub last: i32,
}

/// Visible pieces handed back by a clip call, left to right.
pub type Pieces = SmallVec<[ClipRange; 4]>;

#[derive(Default, Debug)]
pub struct SolidSegs {
    ranges: Vec<ClipRange>,
}

impl SolidSegs {
    /// Reset to "nothing covered" with two sentinels so the scans below
    /// never run off either end.
    pub fn clear(&mut self, width: i32) {
        self.ranges.clear();
        self.ranges.push(ClipRange {
            first: -0x7fff_ffff,
            last: -1,
        });
        self.ranges.push(ClipRange {
            first: width,
            last: 0x7fff_ffff,
        });
    }

    pub fn ranges(&self) -> &[ClipRange] {
        &self.ranges
    }

    /// Every column is covered; nothing behind can show.
    #[inline]
    pub fn is_full(&self) -> bool {
        // both sentinels merged into one range
        self.ranges.len() == 1
    }

    #[inline]
    fn start(&self, first: i32) -> usize {
        self.ranges
            .iter()
            .position(|r| r.last >= first - 1)
            .unwrap_or(self.ranges.len() - 1)
    }

    /// `true` if any column of `first..=last` is still open.
    pub fn is_visible(&self, first: i32, last: i32) -> bool {
        let start = self
            .ranges
            .iter()
            .position(|r| r.last >= last)
            .unwrap_or(self.ranges.len() - 1);
        !(first >= self.ranges[start].first && last <= self.ranges[start].last)
    }

    /// Occluding wall: return the still-open pieces of `first..=last` and
    /// mark the whole range covered.
    pub fn clip_solid(&mut self, first: i32, last: i32) -> Pieces {
        let mut out = Pieces::new();
        let start = self.start(first);
        let r = &mut self.ranges;

        if first < r[start].first {
            if last < r[start].first - 1 {
                // entirely in a gap
                out.push(ClipRange { first, last });
                r.insert(start, ClipRange { first, last });
                return out;
            }
            out.push(ClipRange {
                first,
                last: r[start].first - 1,
            });
            r[start].first = first;
        }

        if last <= r[start].last {
            return out;
        }

        let mut next = start;
        let mut swallowed = false;
        while last >= r[next + 1].first - 1 {
            out.push(ClipRange {
                first: r[next].last + 1,
                last: r[next + 1].first - 1,
            });
            next += 1;
            if last <= r[next].last {
                r[start].last = r[next].last;
                swallowed = true;
                break;
            }
        }
        if !swallowed {
            out.push(ClipRange {
                first: r[next].last + 1,
                last,
            });
            r[start].last = last;
        }

        if next != start {
            r.drain(start + 1..=next);
        }
        out
    }

    /// See-through wall: return the open pieces without covering them.
    pub fn clip_pass(&self, first: i32, last: i32) -> Pieces {
        let mut out = Pieces::new();
        let r = &self.ranges;
        let mut start = self.start(first);

        if first < r[start].first {
            if last < r[start].first - 1 {
                out.push(ClipRange { first, last });
                return out;
            }
            out.push(ClipRange {
                first,
                last: r[start].first - 1,
            });
        }

        if last <= r[start].last {
            return out;
        }

        while last >= r[start + 1].first - 1 {
            out.push(ClipRange {
                first: r[start].last + 1,
                last: r[start + 1].first - 1,
            });
            start += 1;
            if last <= r[start].last {
                return out;
            }
        }
        out.push(ClipRange {
            first: r[start].last + 1,
            last,
        });
        out
    }
}
