//! Image - The pixel container consumed by quantization and conversion
//!
//! # Pixel layout
//!
//! - One 32-bit word per pixel, rows stored top to bottom
//! - RGB pixels are packed `0xRRGGBBAA`
//! - Grayscale pixels are packed `0x0000VVAA`
//! - Indexed pixels hold a palette index (0..=255)
//!
//! # Ownership model
//!
//! `Image` uses `Arc` for cheap cloning (shared ownership), so the frames
//! of an animation can be handed to several passes without copying.
//! To modify pixel data, convert to `ImageMut` via [`Image::try_into_mut`]
//! or [`Image::to_mut`], then convert back with `Into<Image>`.

mod access;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Pixel format of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Packed RGBA, 8 bits per channel
    #[default]
    Rgb,
    /// 8-bit gray value plus 8-bit alpha
    Grayscale,
    /// 8-bit palette index
    Indexed,
}

impl PixelFormat {
    /// Short name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgb => "rgb",
            PixelFormat::Grayscale => "grayscale",
            PixelFormat::Indexed => "indexed",
        }
    }

    /// Largest raw pixel value a pixel of this format may hold.
    pub fn max_value(self) -> u32 {
        match self {
            PixelFormat::Rgb => u32::MAX,
            PixelFormat::Grayscale => 0xffff,
            PixelFormat::Indexed => 0xff,
        }
    }
}

/// Offset of pixel `(x, y)` in a row-major buffer `width` pixels wide.
#[inline]
pub(crate) fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Internal image data
#[derive(Debug)]
struct ImageData {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Pixel format
    format: PixelFormat,
    /// The image data, one word per pixel
    data: Vec<u32>,
}

impl ImageData {
    fn zeroed(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let len = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            format,
            data: vec![0u32; len],
        })
    }
}

/// Image - shared, read-only pixel container
///
/// # Examples
///
/// ```
/// use palquant_core::{Image, PixelFormat};
///
/// let image = Image::new(64, 32, PixelFormat::Rgb).unwrap();
/// assert_eq!(image.width(), 64);
/// assert_eq!(image.height(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct Image {
    inner: Arc<ImageData>,
}

impl Image {
    /// Create a new image with the specified dimensions and format.
    ///
    /// The pixel data is initialized to zero (transparent black for RGB
    /// and grayscale, index 0 for indexed images).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        Ok(Image {
            inner: Arc::new(ImageData::zeroed(width, height, format)?),
        })
    }

    /// Create an image from row-major pixel words.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if a dimension is 0,
    /// [`Error::DimensionMismatch`] if `data` does not hold exactly
    /// `width * height` pixels, and [`Error::InvalidPixelValue`] if a
    /// word does not fit the format.
    pub fn from_pixels(width: u32, height: u32, format: PixelFormat, data: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected: (width, height),
                actual: (data.len() as u32, 1),
            });
        }
        if let Some(&value) = data.iter().find(|&&v| v > format.max_value()) {
            return Err(Error::InvalidPixelValue {
                value,
                format: format.name(),
            });
        }
        Ok(Image {
            inner: Arc::new(ImageData {
                width,
                height,
                format,
                data,
            }),
        })
    }

    /// Get the image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Get the image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Get raw access to the pixel data.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    /// Get the pixels of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_data(&self, y: u32) -> &[u32] {
        let start = pixel_offset(self.inner.width, 0, y);
        &self.inner.data[start..start + self.inner.width as usize]
    }

    /// Check if two images have the same width, height and format.
    pub fn sizes_equal(&self, other: &Image) -> bool {
        self.inner.width == other.inner.width
            && self.inner.height == other.inner.height
            && self.inner.format == other.inner.format
    }

    /// Create a zeroed image with the same dimensions in another format.
    pub fn create_template(&self, format: PixelFormat) -> Self {
        Image {
            inner: Arc::new(ImageData {
                width: self.inner.width,
                height: self.inner.height,
                format,
                data: vec![0u32; self.inner.data.len()],
            }),
        }
    }

    /// Try to get mutable access to the pixel data.
    ///
    /// Succeeds only if there is exactly one reference to the data.
    pub fn try_into_mut(self) -> std::result::Result<ImageMut, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(data) => Ok(ImageMut { inner: data }),
            Err(arc) => Err(Image { inner: arc }),
        }
    }

    /// Create a mutable copy of this image.
    pub fn to_mut(&self) -> ImageMut {
        ImageMut {
            inner: ImageData {
                width: self.inner.width,
                height: self.inner.height,
                format: self.inner.format,
                data: self.inner.data.clone(),
            },
        }
    }

    /// Get mutable access, copying only when the data is shared.
    pub fn into_mut(self) -> ImageMut {
        match self.try_into_mut() {
            Ok(image) => image,
            Err(shared) => shared.to_mut(),
        }
    }
}

/// Mutable image
///
/// Allows modification of pixel data. Convert back to an immutable
/// [`Image`] using `Into<Image>`.
#[derive(Debug)]
pub struct ImageMut {
    inner: ImageData,
}

impl ImageMut {
    /// Create a new zeroed mutable image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        Ok(ImageMut {
            inner: ImageData::zeroed(width, height, format)?,
        })
    }

    /// Get the image width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Get the image height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Get raw access to the pixel data.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    /// Get mutable access to the pixel data.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.inner.data
    }

    /// Get the mutable pixels of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_data_mut(&mut self, y: u32) -> &mut [u32] {
        let start = pixel_offset(self.inner.width, 0, y);
        let end = start + self.inner.width as usize;
        &mut self.inner.data[start..end]
    }

    /// Fill every pixel with `value`.
    pub fn clear(&mut self, value: u32) {
        self.inner.data.fill(value);
    }
}

impl From<ImageMut> for Image {
    fn from(image: ImageMut) -> Self {
        Image {
            inner: Arc::new(image.inner),
        }
    }
}
