//! Ordered dithering
//!
//! Ordered dithering trades exact nearest-color fidelity for smoother
//! gradients: a fixed threshold pattern decides, pixel by pixel, whether a
//! color maps to its nearest palette entry or to the entry on the other
//! side of it.

use crate::{RenderError, RenderResult};
use palquant_core::{Palette, RgbMap, color};

/// Dithering algorithm applied when mapping colors to palette indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitheringAlgorithm {
    /// Plain nearest color
    #[default]
    None,
    /// Choose between the nearest entry and the entry mirrored around the
    /// color, in proportion to how far the color lies between them
    Ordered,
    /// Offset every channel by the matrix threshold before mapping
    Old,
}

/// Threshold pattern tiled over the image.
///
/// Thresholds lie in `0..max_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitheringMatrix {
    rows: usize,
    cols: usize,
    values: Vec<u32>,
    max_value: u32,
}

impl Default for DitheringMatrix {
    /// A 1x1 zero matrix, which never dithers.
    fn default() -> Self {
        Self {
            rows: 1,
            cols: 1,
            values: vec![0],
            max_value: 1,
        }
    }
}

impl DitheringMatrix {
    /// Create a matrix from row-major `values`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidParameters`] if a dimension is zero or
    /// `values` does not hold `rows * cols` thresholds.
    pub fn new(rows: usize, cols: usize, values: Vec<u32>) -> RenderResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(RenderError::InvalidParameters(format!(
                "dithering matrix must not be empty; got {rows}x{cols}"
            )));
        }
        if values.len() != rows * cols {
            return Err(RenderError::InvalidParameters(format!(
                "dithering matrix {rows}x{cols} needs {} values; got {}",
                rows * cols,
                values.len()
            )));
        }
        let max_value = values.iter().copied().max().unwrap_or(0).saturating_add(1);
        Ok(Self {
            rows,
            cols,
            values,
            max_value,
        })
    }

    /// Bayer matrix of order `n` (2, 4 or 8).
    pub fn bayer(n: usize) -> RenderResult<Self> {
        if !matches!(n, 2 | 4 | 8) {
            return Err(RenderError::InvalidParameters(format!(
                "Bayer matrix size must be 2, 4 or 8; got {n}"
            )));
        }

        let mut size = 1;
        let mut values = vec![0u32];
        while size < n {
            let next = size * 2;
            let mut grown = vec![0u32; next * next];
            for y in 0..next {
                for x in 0..next {
                    let quadrant = match (y / size, x / size) {
                        (0, 0) => 0,
                        (0, _) => 2,
                        (_, 0) => 3,
                        _ => 1,
                    };
                    grown[y * next + x] = 4 * values[(y % size) * size + x % size] + quadrant;
                }
            }
            values = grown;
            size = next;
        }

        Ok(Self {
            rows: n,
            cols: n,
            values,
            max_value: (n * n) as u32,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Exclusive upper bound of the thresholds
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Threshold at pixel `(x, y)`; the matrix repeats in both directions.
    pub fn get(&self, y: u32, x: u32) -> u32 {
        let row = y as usize % self.rows;
        let col = x as usize % self.cols;
        self.values[row * self.cols + col]
    }
}

/// Maps colors to palette indices, through an [`RgbMap`] when one is given.
#[derive(Debug, Clone, Copy)]
pub struct ColorMapper<'a> {
    palette: &'a Palette,
    rgbmap: Option<&'a RgbMap>,
    mask_index: Option<usize>,
}

impl<'a> ColorMapper<'a> {
    /// Create a mapper over `palette`.
    ///
    /// The entry at `mask_index` is only produced for fully transparent
    /// colors.
    pub fn new(palette: &'a Palette, rgbmap: Option<&'a RgbMap>, mask_index: Option<usize>) -> Self {
        Self {
            palette,
            rgbmap,
            mask_index,
        }
    }

    /// Palette index nearest to `c`.
    pub fn nearest(&self, c: u32) -> usize {
        let (r, g, b, a) = color::extract_rgba(c);
        if a == 0
            && let Some(mask) = self.mask_index
        {
            return mask;
        }
        match self.rgbmap {
            Some(map) => map.map_color(r, g, b, a),
            None => self
                .palette
                .find_bestfit(r, g, b, a, self.mask_index)
                .or_else(|| self.palette.find_bestfit(r, g, b, a, None))
                .unwrap_or(0),
        }
    }

    /// Palette index for `c` at pixel `(x, y)` under `algorithm`.
    pub fn map(
        &self,
        c: u32,
        x: u32,
        y: u32,
        algorithm: DitheringAlgorithm,
        matrix: &DitheringMatrix,
    ) -> usize {
        if color::alpha(c) == 0 {
            return self.nearest(c);
        }
        match algorithm {
            DitheringAlgorithm::None => self.nearest(c),
            DitheringAlgorithm::Ordered => self.ordered(c, x, y, matrix),
            DitheringAlgorithm::Old => self.offset(c, x, y, matrix),
        }
    }

    fn entry(&self, index: usize) -> u32 {
        self.palette.entry(index).unwrap_or(color::TRANSPARENT)
    }

    fn ordered(&self, c: u32, x: u32, y: u32, matrix: &DitheringMatrix) -> usize {
        let n1 = self.nearest(c);
        let p1 = self.entry(n1);

        // Mirror the nearest entry around the color.
        let (r, g, b, a) = color::extract_rgba(c);
        let (r1, g1, b1, a1) = color::extract_rgba(p1);
        let mirror = |v: u8, v1: u8| (2 * v as i32 - v1 as i32).clamp(0, 255) as u8;
        let n2 = self.nearest(color::compose_rgba(
            mirror(r, r1),
            mirror(g, g1),
            mirror(b, b1),
            mirror(a, a1),
        ));
        if n2 == n1 {
            return n1;
        }

        // Only a color lying between the two entries may move to the far one.
        let d_sq = color::distance_sq(c, p1) as u128;
        let span_sq = color::distance_sq(p1, self.entry(n2)) as u128;
        if d_sq >= span_sq {
            return n1;
        }

        // floor(d * max / span) > threshold, without square roots
        let max = matrix.max_value() as u128;
        let step = matrix.get(y, x) as u128 + 1;
        if d_sq * max * max >= step * step * span_sq {
            n2
        } else {
            n1
        }
    }

    fn offset(&self, c: u32, x: u32, y: u32, matrix: &DitheringMatrix) -> usize {
        // Average distance between neighboring entries on each axis
        let spread = 255.0 / (self.palette.len().max(1) as f64).cbrt();
        let t = (matrix.get(y, x) as f64 + 0.5) / matrix.max_value() as f64 - 0.5;
        let delta = (t * spread).round() as i32;

        let (r, g, b, a) = color::extract_rgba(c);
        let shift = |v: u8| (v as i32 + delta).clamp(0, 255) as u8;
        self.nearest(color::compose_rgba(shift(r), shift(g), shift(b), a))
    }
}
