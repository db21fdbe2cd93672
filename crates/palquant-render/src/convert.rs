//! Pixel format conversion
//!
//! Converts an image between RGB, grayscale and indexed formats. Mapping
//! to indexed goes through an [`RgbMap`] when the caller has one, or a
//! palette scan otherwise, optionally with ordered dithering.
//!
//! Conversion runs row by row. A [`TaskDelegate`] is polled before each
//! row and told about progress after it, so a long conversion can be
//! canceled; rows that were not reached keep their previous contents.

use crate::dithering::{ColorMapper, DitheringAlgorithm, DitheringMatrix};
use crate::task::{self, TaskDelegate, TaskStatus};
use crate::{RenderError, RenderResult};
use log::info;
use palquant_core::{Error, Image, Palette, PixelFormat, RgbMap, color};

/// Options for [`convert_pixel_format`]
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Target pixel format
    pub format: PixelFormat,
    /// Dithering used when mapping to indexed
    pub dithering: DitheringAlgorithm,
    /// Threshold pattern for dithering
    pub matrix: DitheringMatrix,
    /// Whether the image is an opaque background layer. Transparent
    /// pixels of a background have no mask and map like any other color.
    pub is_background: bool,
    /// Palette index of the transparent color in indexed images, if the
    /// palette reserves one
    pub mask_color: Option<usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: PixelFormat::Indexed,
            dithering: DitheringAlgorithm::None,
            matrix: DitheringMatrix::default(),
            is_background: false,
            mask_color: None,
        }
    }
}

/// Result of [`convert_pixel_format`]
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The destination image
    pub image: Image,
    /// Rows converted, counted from the top
    pub rows_done: u32,
    /// Whether every row was converted
    pub status: TaskStatus,
}

/// Convert `src` to `options.format`.
///
/// `dst`, when given, receives the converted pixels and must have the
/// size of `src` and the target format; otherwise a zeroed image is
/// created. `palette` supplies the colors of indexed images on either
/// side of the conversion.
///
/// Cancellation is not an error: the returned [`Conversion`] reports
/// [`TaskStatus::Canceled`] and how many rows were converted.
///
/// # Errors
///
/// Returns an error if `dst` does not match `src` or the target format,
/// if converting to indexed with an empty palette and no `rgbmap`, or if
/// an indexed source refers to an entry the palette does not have.
pub fn convert_pixel_format(
    src: &Image,
    dst: Option<Image>,
    rgbmap: Option<&RgbMap>,
    palette: &Palette,
    options: &ConvertOptions,
    mut delegate: Option<&mut dyn TaskDelegate>,
) -> RenderResult<Conversion> {
    let format = options.format;
    let dst = match dst {
        Some(image) => {
            if image.width() != src.width() || image.height() != src.height() {
                return Err(Error::DimensionMismatch {
                    expected: (src.width(), src.height()),
                    actual: (image.width(), image.height()),
                }
                .into());
            }
            if image.format() != format {
                return Err(RenderError::UnsupportedFormat {
                    expected: format.name(),
                    actual: image.format().name(),
                });
            }
            image
        }
        None => src.create_template(format),
    };
    if format == PixelFormat::Indexed && rgbmap.is_none() && palette.is_empty() {
        return Err(RenderError::InvalidParameters(
            "converting to indexed needs a palette or an rgb map".into(),
        ));
    }

    let converter = PixelConverter::new(src.format(), palette, rgbmap, options);
    let mut out = dst.into_mut();
    let height = src.height();
    let mut rows_done = 0;
    let mut status = TaskStatus::Completed;

    for y in 0..height {
        if task::canceled(&delegate) {
            info!("conversion canceled after {rows_done} of {height} rows");
            status = TaskStatus::Canceled;
            break;
        }
        let src_row = src.row_data(y);
        let dst_row = out.row_data_mut(y);
        for (x, (d, &p)) in dst_row.iter_mut().zip(src_row).enumerate() {
            *d = converter.convert(p, x as u32, y)?;
        }
        rows_done += 1;
        task::report(&mut delegate, rows_done as usize, height as usize);
    }

    Ok(Conversion {
        image: out.into(),
        rows_done,
        status,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Copy,
    RgbToGray,
    RgbToIndexed,
    GrayToRgb,
    GrayToIndexed,
    IndexedToRgb,
    IndexedToGray,
}

struct PixelConverter<'a> {
    route: Route,
    palette: &'a Palette,
    mask: Option<usize>,
    mapper: ColorMapper<'a>,
    options: &'a ConvertOptions,
}

impl<'a> PixelConverter<'a> {
    fn new(
        from: PixelFormat,
        palette: &'a Palette,
        rgbmap: Option<&'a RgbMap>,
        options: &'a ConvertOptions,
    ) -> Self {
        use PixelFormat::*;

        let route = match (from, options.format) {
            (Rgb, Rgb) | (Grayscale, Grayscale) | (Indexed, Indexed) => Route::Copy,
            (Rgb, Grayscale) => Route::RgbToGray,
            (Rgb, Indexed) => Route::RgbToIndexed,
            (Grayscale, Rgb) => Route::GrayToRgb,
            (Grayscale, Indexed) => Route::GrayToIndexed,
            (Indexed, Rgb) => Route::IndexedToRgb,
            (Indexed, Grayscale) => Route::IndexedToGray,
        };
        let mask = options.mask_color.filter(|_| !options.is_background);
        Self {
            route,
            palette,
            mask,
            mapper: ColorMapper::new(palette, rgbmap, mask),
            options,
        }
    }

    /// Alpha to write for a visible source pixel.
    fn alpha(&self, a: u8) -> u8 {
        if self.options.is_background { 255 } else { a }
    }

    fn convert(&self, p: u32, x: u32, y: u32) -> RenderResult<u32> {
        let background = self.options.is_background;
        let out = match self.route {
            Route::Copy => p,
            Route::RgbToGray => {
                let (r, g, b, a) = color::extract_rgba(p);
                if a == 0 && !background {
                    color::TRANSPARENT
                } else {
                    color::compose_graya(color::luma(r, g, b), self.alpha(a))
                }
            }
            Route::RgbToIndexed => self.index_of(p, x, y),
            Route::GrayToRgb => {
                let (v, a) = (color::gray_value(p), color::gray_alpha(p));
                if a == 0 && !background {
                    color::TRANSPARENT
                } else {
                    color::compose_rgba(v, v, v, self.alpha(a))
                }
            }
            Route::GrayToIndexed => {
                let v = color::gray_value(p);
                self.index_of(color::compose_rgba(v, v, v, color::gray_alpha(p)), x, y)
            }
            Route::IndexedToRgb => self.index_color(p)?,
            Route::IndexedToGray => {
                let c = self.index_color(p)?;
                let (r, g, b, a) = color::extract_rgba(c);
                if a == 0 {
                    color::TRANSPARENT
                } else {
                    color::compose_graya(color::luma(r, g, b), a)
                }
            }
        };
        Ok(out)
    }

    fn index_of(&self, c: u32, x: u32, y: u32) -> u32 {
        if color::alpha(c) == 0
            && let Some(mask) = self.mask
        {
            return mask as u32;
        }
        let c = if self.options.is_background {
            c | color::ALPHA_MASK
        } else {
            c
        };
        let index = self
            .mapper
            .map(c, x, y, self.options.dithering, &self.options.matrix);
        index as u32
    }

    fn index_color(&self, p: u32) -> RenderResult<u32> {
        let index = p as usize;
        if self.mask == Some(index) {
            return Ok(color::TRANSPARENT);
        }
        self.palette.entry(index).ok_or_else(|| {
            Error::IndexOutOfBounds {
                index,
                len: self.palette.len(),
            }
            .into()
        })
    }
}
