//! palquant Core - Basic data structures for color quantization
//!
//! This crate provides the fundamental data structures used throughout
//! the palquant library:
//!
//! - [`Image`] / [`ImageMut`] - The pixel container (immutable / mutable)
//! - [`PixelFormat`] - RGB, grayscale or indexed pixel layout
//! - [`Palette`] - Ordered color table for indexed images
//! - [`RgbMap`] - Precomputed color to palette index lookup
//!
//! The [`color`] module holds the packed pixel helpers shared by every crate.

pub mod error;
pub mod image;
pub mod palette;

pub use error::{Error, Result};
pub use image::{Image, ImageMut, PixelFormat};
pub use palette::{MAX_PALETTE_SIZE, Palette, RgbMap};

/// Color channel helpers for packed 32-bit pixels.
///
/// # Pixel format
///
/// RGB pixels are stored as `0xRRGGBBAA` (red in MSB, alpha in LSB).
/// Grayscale pixels are stored as `0x0000VVAA` (value, then alpha).
/// Indexed pixels hold the palette index in the low byte.
pub mod color {
    /// Shift amounts for extracting color channels
    pub const RED_SHIFT: u32 = 24;
    pub const GREEN_SHIFT: u32 = 16;
    pub const BLUE_SHIFT: u32 = 8;
    pub const ALPHA_SHIFT: u32 = 0;

    /// Mask selecting the alpha channel of a packed RGBA pixel.
    pub const ALPHA_MASK: u32 = 0xff << ALPHA_SHIFT;

    /// Fully transparent black.
    pub const TRANSPARENT: u32 = 0;

    /// Extract red component from a 32-bit pixel.
    #[inline]
    pub fn red(pixel: u32) -> u8 {
        ((pixel >> RED_SHIFT) & 0xff) as u8
    }

    /// Extract green component from a 32-bit pixel.
    #[inline]
    pub fn green(pixel: u32) -> u8 {
        ((pixel >> GREEN_SHIFT) & 0xff) as u8
    }

    /// Extract blue component from a 32-bit pixel.
    #[inline]
    pub fn blue(pixel: u32) -> u8 {
        ((pixel >> BLUE_SHIFT) & 0xff) as u8
    }

    /// Extract alpha component from a 32-bit pixel.
    #[inline]
    pub fn alpha(pixel: u32) -> u8 {
        ((pixel >> ALPHA_SHIFT) & 0xff) as u8
    }

    /// Compose a 32-bit RGB pixel (alpha = 255).
    #[inline]
    pub fn compose_rgb(r: u8, g: u8, b: u8) -> u32 {
        compose_rgba(r, g, b, 255)
    }

    /// Compose a 32-bit RGBA pixel.
    #[inline]
    pub fn compose_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
        ((r as u32) << RED_SHIFT)
            | ((g as u32) << GREEN_SHIFT)
            | ((b as u32) << BLUE_SHIFT)
            | ((a as u32) << ALPHA_SHIFT)
    }

    /// Extract RGB values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgb(pixel: u32) -> (u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel))
    }

    /// Extract RGBA values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgba(pixel: u32) -> (u8, u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel), alpha(pixel))
    }

    /// Compose a grayscale pixel from a value and an alpha.
    #[inline]
    pub fn compose_graya(value: u8, a: u8) -> u32 {
        ((value as u32) << 8) | a as u32
    }

    /// Extract the gray value of a grayscale pixel.
    #[inline]
    pub fn gray_value(pixel: u32) -> u8 {
        ((pixel >> 8) & 0xff) as u8
    }

    /// Extract the alpha of a grayscale pixel.
    #[inline]
    pub fn gray_alpha(pixel: u32) -> u8 {
        (pixel & 0xff) as u8
    }

    /// Rec. 709 luma of an RGB triple, rounded to the nearest integer.
    #[inline]
    pub fn luma(r: u8, g: u8, b: u8) -> u8 {
        let y = r as u32 * 2126 + g as u32 * 7152 + b as u32 * 722;
        ((y + 5000) / 10000) as u8
    }

    /// Squared RGBA distance between two packed pixels.
    #[inline]
    pub fn distance_sq(c1: u32, c2: u32) -> u32 {
        let (r1, g1, b1, a1) = extract_rgba(c1);
        let (r2, g2, b2, a2) = extract_rgba(c2);
        let dr = r1 as i32 - r2 as i32;
        let dg = g1 as i32 - g2 as i32;
        let db = b1 as i32 - b2 as i32;
        let da = a1 as i32 - a2 as i32;
        (dr * dr + dg * dg + db * db + da * da) as u32
    }

}
