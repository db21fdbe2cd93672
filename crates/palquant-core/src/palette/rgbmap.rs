//! RgbMap - Precomputed nearest-entry lookup for a palette
//!
//! The RGB cube is divided into 32x32x32 cells (5 bits per channel). Each
//! cell stores the palette entry nearest to the cell center, so mapping a
//! color during conversion is a single table read instead of a palette
//! scan.

use super::Palette;
use crate::error::{Error, Result};

const CELL_BITS: u32 = 5;
const CELLS_PER_CHANNEL: usize = 1 << CELL_BITS;
const CELL_SHIFT: u32 = 8 - CELL_BITS;
const CELL_CENTER: u8 = 1 << (CELL_SHIFT - 1);

/// Color to palette index lookup table
#[derive(Debug, Clone)]
pub struct RgbMap {
    table: Vec<u8>,
    mask_index: Option<usize>,
    palette_len: usize,
}

impl RgbMap {
    /// Build the lookup table for `palette`.
    ///
    /// `mask_index` is excluded from the nearest-color search and is
    /// returned by [`map_color`](Self::map_color) for fully transparent
    /// colors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the palette is empty and
    /// [`Error::IndexOutOfBounds`] if `mask_index` is outside it.
    pub fn new(palette: &Palette, mask_index: Option<usize>) -> Result<Self> {
        if palette.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot build an rgb map for an empty palette".into(),
            ));
        }
        if let Some(mask) = mask_index
            && mask >= palette.len()
        {
            return Err(Error::IndexOutOfBounds {
                index: mask,
                len: palette.len(),
            });
        }

        let mut table = vec![0u8; CELLS_PER_CHANNEL * CELLS_PER_CHANNEL * CELLS_PER_CHANNEL];
        for (cell, entry) in table.iter_mut().enumerate() {
            let r = cell_center(cell >> (2 * CELL_BITS));
            let g = cell_center(cell >> CELL_BITS);
            let b = cell_center(cell);
            // A palette made only of the mask entry still maps somewhere.
            let index = palette
                .find_bestfit(r, g, b, 255, mask_index)
                .or_else(|| palette.find_bestfit(r, g, b, 255, None))
                .unwrap_or(0);
            *entry = index as u8;
        }

        Ok(Self {
            table,
            mask_index,
            palette_len: palette.len(),
        })
    }

    /// Index of the palette entry nearest to the given color.
    #[inline]
    pub fn map_color(&self, r: u8, g: u8, b: u8, a: u8) -> usize {
        if a == 0
            && let Some(mask) = self.mask_index
        {
            return mask;
        }
        let cell = ((r >> CELL_SHIFT) as usize) << (2 * CELL_BITS)
            | ((g >> CELL_SHIFT) as usize) << CELL_BITS
            | (b >> CELL_SHIFT) as usize;
        self.table[cell] as usize
    }

    /// Index returned for transparent colors, if any.
    #[inline]
    pub fn mask_index(&self) -> Option<usize> {
        self.mask_index
    }

    /// Number of entries in the palette the map was built from.
    #[inline]
    pub fn palette_len(&self) -> usize {
        self.palette_len
    }
}

fn cell_center(cell: usize) -> u8 {
    (((cell & (CELLS_PER_CHANNEL - 1)) as u8) << CELL_SHIFT) | CELL_CENTER
}
