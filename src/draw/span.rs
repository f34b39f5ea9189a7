use super::{DrawTables, Shade, SpanDrawContext};
use crate::framebuffer::Canvas;

/// Draw one row of a 64×64 flat from `x1` to `x2` inclusive.
pub fn draw_span<P: Shade>(canvas: &mut Canvas<P>, ds: &SpanDrawContext, t: &DrawTables) {
    if ds.y < 0 || ds.y >= canvas.height {
        return;
    }
    let x1 = ds.x1.max(0);
    let x2 = ds.x2.min(canvas.width - 1);
    if x2 < x1 {
        return;
    }

    // clipped-off pixels still advance the texture position
    let skipped = x1 - ds.x1;
    let mut xfrac = ds.xfrac.wrapping_add(skipped.wrapping_mul(ds.xstep));
    let mut yfrac = ds.yfrac.wrapping_add(skipped.wrapping_mul(ds.ystep));
    let mut dest = canvas.offset(x1, ds.y);

    for _ in x1..=x2 {
        let spot = ((yfrac >> (16 - 6)) & (63 * 64)) + ((xfrac >> 16) & 63);
        canvas.pixels[dest] = P::from_index(ds.colormap[ds.source[spot as usize] as usize], t);
        dest += 1;
        xfrac = xfrac.wrapping_add(ds.xstep);
        yfrac = yfrac.wrapping_add(ds.ystep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::test_support::tables;
    use crate::fixed::FRACUNIT;
    use crate::framebuffer::FrameBuffer;

    fn flat() -> Vec<u8> {
        (0..4096).map(|i| (i % 251) as u8).collect()
    }

    fn span<'a>(src: &'a [u8], cm: &'a [u8; 256]) -> SpanDrawContext<'a> {
        SpanDrawContext {
            y: 1,
            x1: 2,
            x2: 5,
            xfrac: 3 * FRACUNIT,
            yfrac: 5 * FRACUNIT,
            xstep: FRACUNIT,
            ystep: 0,
            source: src,
            colormap: cm,
        }
    }

    #[test]
    fn spot_indexes_row_major_flat() {
        let t = tables();
        let src = flat();
        let cm = t.colormaps[0];
        let mut fb: FrameBuffer<u8> = FrameBuffer::new(8, 3, 8);
        draw_span(&mut fb.canvas(), &span(&src, &cm), &t);
        let c = fb.canvas();
        for (i, x) in (2..=5).enumerate() {
            let spot = 5 * 64 + 3 + i;
            assert_eq!(c.get(x, 1), src[spot], "x={x}");
        }
        assert_eq!(c.get(1, 1), 0);
        assert_eq!(c.get(6, 1), 0);
        assert_eq!(c.get(3, 0), 0);
    }

    #[test]
    fn coordinates_wrap_at_64() {
        let t = tables();
        let src = flat();
        let cm = t.colormaps[0];
        let mut fb: FrameBuffer<u8> = FrameBuffer::new(8, 3, 8);
        let mut ds = span(&src, &cm);
        ds.xfrac = 63 * FRACUNIT;
        ds.yfrac = -FRACUNIT;
        draw_span(&mut fb.canvas(), &ds, &t);
        let c = fb.canvas();
        assert_eq!(c.get(2, 1), src[63 * 64 + 63]);
        assert_eq!(c.get(3, 1), src[63 * 64]);
    }

    #[test]
    fn left_clip_keeps_texture_registration() {
        let t = tables();
        let src = flat();
        let cm = t.colormaps[0];
        let mut full: FrameBuffer<u8> = FrameBuffer::new(8, 3, 8);
        let mut clipped: FrameBuffer<u8> = FrameBuffer::new(8, 3, 8);
        let mut ds = span(&src, &cm);
        ds.x1 = 0;
        draw_span(&mut full.canvas(), &ds, &t);
        ds.x1 = -3;
        ds.xfrac -= 3 * FRACUNIT;
        draw_span(&mut clipped.canvas(), &ds, &t);
        assert_eq!(full.pixels(), clipped.pixels());
    }
}
