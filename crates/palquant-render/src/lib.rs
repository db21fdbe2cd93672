//! palquant Render - Color quantization and pixel format conversion
//!
//! This crate reduces full-color images to a bounded palette and remaps
//! pixels to it:
//!
//! - **Octree** ([`octree`]): recursive partition of the color cube with
//!   leaf-count driven pruning
//! - **Histogram optimizer** ([`optimizer`], [`histogram`]): median cut over a
//!   5-6-5-5 bit color histogram
//! - **Palette from frames** ([`palette_gen`]): one palette for a range of
//!   animation frames
//! - **Dithering** ([`dithering`]): ordered dithering matrices and algorithms
//! - **Conversion** ([`convert`]): RGB, grayscale and indexed conversion with
//!   progress reporting and cancellation ([`task`])
//!
//! # Parallel accumulation
//!
//! With the `parallel` feature, [`Octree::feed_with_image_par`] splits an
//! image into row bands accumulated on the rayon pool. Without it, partial
//! accumulators built on separate threads can still be combined with
//! [`Octree::merge`] or [`PaletteOptimizer::merge`].

pub mod convert;
pub mod dithering;
pub mod error;
pub mod histogram;
pub mod octree;
pub mod optimizer;
pub mod palette_gen;
pub mod task;

mod pixels;

// Re-export core types
pub use palquant_core;

// Re-export error types
pub use error::{RenderError, RenderResult};

// Re-export quantization types
pub use histogram::ColorHistogram;
pub use octree::{LeavesCount, Node, Octree, SubtotalPixelsCount};
pub use optimizer::PaletteOptimizer;
pub use palette_gen::{PaletteOptions, QuantizeAlgorithm, create_palette_from_frames};

// Re-export conversion types
pub use convert::{ConvertOptions, Conversion, convert_pixel_format};
pub use dithering::{ColorMapper, DitheringAlgorithm, DitheringMatrix};
pub use task::{TaskDelegate, TaskStatus};
