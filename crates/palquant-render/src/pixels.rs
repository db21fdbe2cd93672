//! Reading images as RGBA samples for the accumulators

use crate::{RenderError, RenderResult};
use palquant_core::{Image, PixelFormat, color};
use std::ops::Range;

/// Call `f` with the RGBA color of every visible pixel in `rows`.
///
/// RGB pixels are used as stored and grayscale pixels are expanded to
/// gray RGB. Fully transparent pixels are skipped. When `with_alpha` is
/// false every color is made opaque.
///
/// # Errors
///
/// Returns [`RenderError::UnsupportedFormat`] for indexed images, whose
/// colors depend on a palette the accumulators do not have.
pub(crate) fn for_each_color(
    image: &Image,
    rows: Range<u32>,
    with_alpha: bool,
    mut f: impl FnMut(u32),
) -> RenderResult<()> {
    let to_rgba: fn(u32) -> u32 = match image.format() {
        PixelFormat::Rgb => |p| p,
        PixelFormat::Grayscale => |p| {
            let v = color::gray_value(p);
            color::compose_rgba(v, v, v, color::gray_alpha(p))
        },
        PixelFormat::Indexed => {
            return Err(RenderError::UnsupportedFormat {
                expected: "rgb or grayscale",
                actual: image.format().name(),
            });
        }
    };

    let end = rows.end.min(image.height());
    for y in rows.start..end {
        for &pixel in image.row_data(y) {
            let c = to_rgba(pixel);
            if color::alpha(c) == 0 {
                continue;
            }
            f(if with_alpha { c } else { c | color::ALPHA_MASK });
        }
    }
    Ok(())
}
