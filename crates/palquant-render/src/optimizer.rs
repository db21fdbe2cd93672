//! Histogram-based palette optimizer
//!
//! An alternative to the octree that keeps a fixed-resolution histogram
//! (5 bits red, 6 bits green, 5 bits blue, 5 bits alpha) and derives the
//! palette from it by median cut. It copes better with photographic
//! gradients, which the octree tends to band.

use crate::histogram::ColorHistogram;
use crate::pixels::for_each_color;
use crate::RenderResult;
use palquant_core::{Image, Palette, color};

/// Histogram used by [`PaletteOptimizer`].
pub type OptimizerHistogram = ColorHistogram<5, 6, 5, 5>;

/// Histogram palette optimizer
#[derive(Debug, Clone, Default)]
pub struct PaletteOptimizer {
    histogram: OptimizerHistogram,
}

impl PaletteOptimizer {
    /// Create an optimizer with an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated histogram.
    pub fn histogram(&self) -> &OptimizerHistogram {
        &self.histogram
    }

    /// Accumulate every visible pixel of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnsupportedFormat`](crate::RenderError) for
    /// indexed images.
    pub fn feed_with_image(&mut self, image: &Image, with_alpha: bool) -> RenderResult<()> {
        let histogram = &mut self.histogram;
        for_each_color(image, 0..image.height(), with_alpha, |c| {
            histogram.add_samples(c, 1)
        })
    }

    /// Accumulate one packed RGBA color.
    pub fn feed_with_rgba_color(&mut self, c: u32) {
        self.histogram.add_samples(c, 1);
    }

    /// Add the statistics of another optimizer.
    pub fn merge(&mut self, other: &PaletteOptimizer) {
        self.histogram.merge(&other.histogram);
    }

    /// Write the optimized palette to `palette`.
    ///
    /// The current length of `palette` is the number of colors wanted. If
    /// `mask_index` is given and lies inside the palette, that slot is
    /// reserved for transparent black and the generated colors are laid
    /// out around it. Otherwise the palette is shrunk to the colors
    /// actually used (at least one entry).
    pub fn calculate(&self, palette: &mut Palette, mask_index: Option<usize>) -> RenderResult<()> {
        generate_around_mask(palette, mask_index, |pal| {
            self.histogram.create_optimized_palette(pal)
        })
    }
}

/// Mask slot to reserve in a palette of `len` entries, if any.
pub(crate) fn reserved_mask_slot(len: usize, mask_index: Option<usize>) -> Option<usize> {
    mask_index.filter(|&mask| len > 1 && mask < len)
}

/// Run `generate` on `palette` keeping the mask slot free.
///
/// `generate` writes its colors to the leading entries of the palette it
/// receives and returns how many it wrote. With a reserved slot the
/// palette passed in is one entry shorter; the colors at or after the
/// mask index are then shifted up by one and the mask slot is set to
/// transparent black, padding with opaque black if the mask lies past
/// the generated colors.
pub(crate) fn generate_around_mask(
    palette: &mut Palette,
    mask_index: Option<usize>,
    generate: impl FnOnce(&mut Palette) -> RenderResult<usize>,
) -> RenderResult<()> {
    let Some(mask) = reserved_mask_slot(palette.len(), mask_index) else {
        let used = generate(palette)?;
        palette.resize(used.max(1))?;
        return Ok(());
    };

    palette.resize(palette.len() - 1)?;
    let used = generate(palette)?.min(palette.len());

    let mut colors = palette.colors()[..used].to_vec();
    if mask <= used {
        colors.insert(mask, color::TRANSPARENT);
    } else {
        colors.resize(mask, color::compose_rgb(0, 0, 0));
        colors.push(color::TRANSPARENT);
    }
    *palette = Palette::from_colors(colors)?;
    Ok(())
}
