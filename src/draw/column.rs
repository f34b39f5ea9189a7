use super::{ColumnDrawContext, ColumnKind, DrawTables, FuzzState, Shade, fuzz::draw_fuzz_column};
use crate::{fixed::FRACBITS, framebuffer::Canvas};

/// Draw one column of `dc` with the given drawer.
///
/// Rows outside the canvas are skipped; `yh < yl` draws nothing.
pub fn draw_column<P: Shade>(
    canvas: &mut Canvas<P>,
    dc: &ColumnDrawContext,
    kind: ColumnKind,
    t: &DrawTables,
    fuzz: &mut FuzzState,
) {
    if dc.x < 0 || dc.x >= canvas.width {
        return;
    }
    if kind == ColumnKind::Fuzz {
        draw_fuzz_column(canvas, dc, t, fuzz);
        return;
    }

    let cm = dc.colormap;
    match (kind, dc.translation) {
        (ColumnKind::Plain, _) | (ColumnKind::Translated, None) => {
            run(canvas, dc, |_, tex| P::from_index(cm[tex as usize], t))
        }
        (ColumnKind::Stretch, _) => run(canvas, dc, |_, tex| P::from_index(tex, t)),
        (ColumnKind::Fill, _) => {
            let c = P::from_index(dc.color, t);
            run(canvas, dc, |_, _| c)
        }
        (ColumnKind::Translucent, _) | (ColumnKind::TranslatedTranslucent, None) => {
            run(canvas, dc, |dst, tex| P::blend(dst, cm[tex as usize], t))
        }
        (ColumnKind::Translated, Some(tr)) => {
            run(canvas, dc, |_, tex| P::from_index(cm[tr[tex as usize] as usize], t))
        }
        (ColumnKind::TranslatedTranslucent, Some(tr)) => {
            run(canvas, dc, |dst, tex| P::blend(dst, cm[tr[tex as usize] as usize], t))
        }
        (ColumnKind::Fuzz, _) => {}
    }
}

/// The shared stepping loop; `shade(dst, texel)` produces each pixel.
#[inline(always)]
fn run<P: Shade>(canvas: &mut Canvas<P>, dc: &ColumnDrawContext, mut shade: impl FnMut(P, u8) -> P) {
    let yl = dc.yl.max(0);
    let yh = dc.yh.min(canvas.height - 1);
    let count = yh - yl + 1;
    if count <= 0 {
        return;
    }

    let pitch = canvas.pitch;
    let mut dest = canvas.offset(dc.x, yl);
    let mut frac = dc
        .texturemid
        .wrapping_add((yl - dc.centery).wrapping_mul(dc.iscale));

    for _ in 0..count {
        let tex = dc.source[((frac >> FRACBITS) & dc.mask) as usize];
        canvas.pixels[dest] = shade(canvas.pixels[dest], tex);
        dest += pitch;
        frac = frac.wrapping_add(dc.iscale);
    }
}
