//! palquant - Color quantization for pixel-art sprites
//!
//! Reduces full-color images to a bounded palette and converts them to
//! indexed pixels.
//!
//! # Overview
//!
//! - Octree quantization with deterministic pruning
//! - Histogram (median cut) palette optimization
//! - One palette for a range of animation frames
//! - RGB, grayscale and indexed conversion with ordered dithering
//! - Cooperative cancellation and progress reporting
//!
//! # Example
//!
//! ```
//! use palquant::color::compose_rgb;
//! use palquant::render::{ConvertOptions, Octree, convert_pixel_format};
//! use palquant::{Image, Palette, PixelFormat};
//!
//! let pixels = vec![
//!     compose_rgb(255, 0, 0),
//!     compose_rgb(255, 0, 0),
//!     compose_rgb(0, 255, 0),
//!     compose_rgb(0, 0, 255),
//! ];
//! let image = Image::from_pixels(2, 2, PixelFormat::Rgb, pixels).unwrap();
//!
//! let mut octree = Octree::new(2, 6, false).unwrap();
//! octree.feed_with_image(&image, false).unwrap();
//! let mut palette = Palette::default();
//! octree.generate_palette(&mut palette).unwrap();
//! assert_eq!(palette.len(), 2);
//!
//! let options = ConvertOptions {
//!     is_background: true,
//!     ..Default::default()
//! };
//! let indexed = convert_pixel_format(&image, None, None, &palette, &options, None).unwrap();
//! assert!(indexed.status.is_completed());
//! assert_eq!(indexed.image.format(), PixelFormat::Indexed);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use palquant_core::*;

// Re-export quantization and conversion as a module
pub use palquant_render as render;
