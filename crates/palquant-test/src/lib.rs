//! palquant-test - Regression test framework for palquant
//!
//! This crate provides a small regression test harness shared by the
//! integration tests of every palquant crate, supporting two modes:
//!
//! - **Compare**: Check values and images, record failures (default)
//! - **Display**: Same checks, plus verbose dumps of intermediate results
//!
//! # Usage
//!
//! ```ignore
//! use palquant_test::{RegParams, RegTestMode};
//!
//! let mut rp = RegParams::new("octree");
//! rp.compare_values(16.0, palette.len() as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "compare" or "display"

mod error;
mod params;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

use palquant_core::{Image, ImageMut, PixelFormat, color};

/// Build an RGB image whose pixels come from `f(x, y)`.
///
/// # Errors
///
/// Returns [`TestError::Fixture`] if the dimensions are invalid.
pub fn rgb_image_from_fn(
    name: &str,
    width: u32,
    height: u32,
    f: impl Fn(u32, u32) -> u32,
) -> TestResult<Image> {
    let mut image = ImageMut::new(width, height, PixelFormat::Rgb).map_err(|e| TestError::Fixture {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    for y in 0..height {
        for x in 0..width {
            image.set_pixel_unchecked(x, y, f(x, y));
        }
    }
    Ok(image.into())
}

/// A red/green gradient over a constant blue channel.
pub fn color_gradient(width: u32, height: u32) -> TestResult<Image> {
    rgb_image_from_fn("color_gradient", width, height, |x, y| {
        let r = ((x * 255) / width.max(2).saturating_sub(1)) as u8;
        let g = ((y * 255) / height.max(2).saturating_sub(1)) as u8;
        color::compose_rgb(r, g, 128)
    })
}

/// An image filled with a single color.
pub fn solid_image(width: u32, height: u32, pixel: u32) -> TestResult<Image> {
    rgb_image_from_fn("solid_image", width, height, |_, _| pixel)
}

/// An image made of `colors.len()` vertical stripes, one per color.
pub fn stripes(width: u32, height: u32, colors: &[u32]) -> TestResult<Image> {
    if colors.is_empty() {
        return Err(TestError::Fixture {
            name: "stripes".into(),
            message: "at least one color is required".into(),
        });
    }
    let n = colors.len() as u32;
    rgb_image_from_fn("stripes", width, height, |x, _| {
        colors[((x * n) / width) as usize]
    })
}
