//! Palette - Color table for indexed images
//!
//! A palette is an ordered list of packed RGBA colors; the position of a
//! color is the value indexed pixels store. Palettes hold at most
//! [`MAX_PALETTE_SIZE`] entries so every index fits in 8 bits.

mod rgbmap;

pub use rgbmap::RgbMap;

use crate::color;
use crate::error::{Error, Result};

/// Maximum number of palette entries.
pub const MAX_PALETTE_SIZE: usize = 256;

/// Entry value used when a palette grows.
const FILL_COLOR: u32 = 0x0000_00ff;

/// Ordered color table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    /// Create a palette of `size` opaque black entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `size` exceeds
    /// [`MAX_PALETTE_SIZE`].
    pub fn new(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            colors: vec![FILL_COLOR; size],
        })
    }

    /// Create a palette holding the given packed colors.
    pub fn from_colors(colors: Vec<u32>) -> Result<Self> {
        check_size(colors.len())?;
        Ok(Self { colors })
    }

    /// Get the number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get the color at `index`
    #[inline]
    pub fn entry(&self, index: usize) -> Option<u32> {
        self.colors.get(index).copied()
    }

    /// Replace the color at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len()`.
    pub fn set_entry(&mut self, index: usize, color: u32) -> Result<()> {
        let len = self.colors.len();
        let slot = self
            .colors
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        *slot = color;
        Ok(())
    }

    /// Append a color and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaletteFull`] if the palette already has
    /// [`MAX_PALETTE_SIZE`] entries.
    pub fn add_color(&mut self, color: u32) -> Result<usize> {
        if self.colors.len() >= MAX_PALETTE_SIZE {
            return Err(Error::PaletteFull(self.colors.len()));
        }
        self.colors.push(color);
        Ok(self.colors.len() - 1)
    }

    /// Grow or shrink the palette. New entries are opaque black.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        check_size(size)?;
        self.colors.resize(size, FILL_COLOR);
        Ok(())
    }

    /// Get all colors as a slice
    #[inline]
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Find the entry closest to the given color.
    ///
    /// Distance is the squared Euclidean distance over R, G, B and A.
    /// The entry at `skip` (typically the mask index) is never returned.
    /// Ties resolve to the lowest index. Returns `None` when no entry is
    /// eligible.
    pub fn find_bestfit(&self, r: u8, g: u8, b: u8, a: u8, skip: Option<usize>) -> Option<usize> {
        let target = color::compose_rgba(r, g, b, a);
        let mut best: Option<(usize, u32)> = None;
        for (i, &entry) in self.colors.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            let dist = color::distance_sq(target, entry);
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((i, dist));
                if dist == 0 {
                    break;
                }
            }
        }
        best.map(|(i, _)| i)
    }
}

fn check_size(size: usize) -> Result<()> {
    if size > MAX_PALETTE_SIZE {
        return Err(Error::InvalidParameter(format!(
            "palette size must be at most {MAX_PALETTE_SIZE}; got {size}"
        )));
    }
    Ok(())
}
