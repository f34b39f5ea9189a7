use super::{ColumnDrawContext, DrawTables, Shade};
use crate::framebuffer::Canvas;

/// Length of the fuzz offset cycle.
pub const FUZZTABLE: usize = 64;

/// Row offsets (in rows, scaled by pitch when used) of the pixel each
/// fuzz pixel copies from.
const FUZZ_OFFSETS: [i8; FUZZTABLE] = [
    1, -1, 1, -1, 1, 1, -1, 1, 1, -1, 1, 1, 1, -1, 1, 1, 1, -1, -1, -1, -1, 1, -1, -1, 1, 1, 1, 1,
    -1, 1, -1, 1, 1, -1, -1, 1, 1, -1, -1, -1, -1, 1, 1, 1, 1, -1, 1, 1, -1, 1, 1, -1, 1, -1, 1, 1,
    -1, 1, 1, -1, 1, 1, 1, -1,
];

/// Position in the fuzz cycle; carried from column to column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FuzzState {
    pos: usize,
}

impl FuzzState {
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }
}

/// Fuzz reads the rows above and below, so the first and last row of the
/// window are never drawn.
pub(super) fn draw_fuzz_column<P: Shade>(
    canvas: &mut Canvas<P>,
    dc: &ColumnDrawContext,
    t: &DrawTables,
    state: &mut FuzzState,
) {
    let yl = dc.yl.max(1);
    let yh = dc.yh.min(canvas.height - 2);
    let count = yh - yl + 1;
    if count <= 0 {
        return;
    }

    let pitch = canvas.pitch;
    let mut dest = canvas.offset(dc.x, yl);
    let mut fuzz = state.pos;

    for _ in 0..count {
        let src = if FUZZ_OFFSETS[fuzz] < 0 { dest - pitch } else { dest + pitch };
        canvas.pixels[dest] = P::darken(canvas.pixels[src], t);
        fuzz = (fuzz + 1) & (FUZZTABLE - 1);
        dest += pitch;
    }

    state.pos = (state.pos + count as usize + 3) & (FUZZTABLE - 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{ColumnKind, draw_column, test_support::tables};
    use crate::fixed::FRACUNIT;
    use crate::framebuffer::FrameBuffer;

    fn fuzz_ctx<'a>(cm: &'a [u8; 256], yl: i32, yh: i32) -> ColumnDrawContext<'a> {
        ColumnDrawContext {
            x: 0,
            yl,
            yh,
            iscale: FRACUNIT,
            texturemid: 0,
            centery: 0,
            source: &[0],
            mask: 0,
            colormap: cm,
            translation: None,
            color: 0,
        }
    }

    #[test]
    fn pattern_is_balanced_enough() {
        let ups = FUZZ_OFFSETS.iter().filter(|&&o| o < 0).count();
        assert!(ups > 16 && ups < 48);
        assert!(FUZZ_OFFSETS.iter().all(|&o| o == 1 || o == -1));
    }

    #[test]
    fn advance_is_count_plus_three() {
        let t = tables();
        let cm = t.colormaps[0];
        let mut fb: FrameBuffer<u8> = FrameBuffer::new(1, 100, 1);
        let mut st = FuzzState::default();

        draw_column(&mut fb.canvas(), &fuzz_ctx(&cm, 10, 19), ColumnKind::Fuzz, &t, &mut st);
        assert_eq!(st.pos(), 13);

        // 70 rows wrap the 64-entry cycle
        draw_column(&mut fb.canvas(), &fuzz_ctx(&cm, 10, 79), ColumnKind::Fuzz, &t, &mut st);
        assert_eq!(st.pos(), (13 + 70 + 3) % 64);

        // nothing drawn, nothing advanced
        draw_column(&mut fb.canvas(), &fuzz_ctx(&cm, 30, 20), ColumnKind::Fuzz, &t, &mut st);
        assert_eq!(st.pos(), (13 + 70 + 3) % 64);
    }

    #[test]
    fn edges_are_clamped_and_pixels_darkened() {
        let t = tables();
        let cm = t.colormaps[0];
        let mut fb: FrameBuffer<u8> = FrameBuffer::new(1, 8, 1);
        fb.fill(200);
        let mut st = FuzzState::default();
        draw_column(&mut fb.canvas(), &fuzz_ctx(&cm, -5, 50), ColumnKind::Fuzz, &t, &mut st);
        let c = fb.canvas();
        assert_eq!(c.get(0, 0), 200);
        assert_eq!(c.get(0, 7), 200);
        // rows 1..=6 were drawn: 6 rows, advance 9
        assert_eq!(st.pos(), 9);
        // first row copies the untouched row 2 through the halving map
        assert_eq!(c.get(0, 1), 100);
    }

    #[test]
    fn true_colour_fuzz_is_three_quarters() {
        let t = tables();
        let cm = t.colormaps[0];
        let mut fb: FrameBuffer<u32> = FrameBuffer::new(1, 4, 1);
        fb.fill(0xff80_4020);
        let mut st = FuzzState::default();
        draw_column(&mut fb.canvas(), &fuzz_ctx(&cm, 1, 1), ColumnKind::Fuzz, &t, &mut st);
        assert_eq!(fb.canvas().get(0, 1), 0xff60_3018);
    }
}
