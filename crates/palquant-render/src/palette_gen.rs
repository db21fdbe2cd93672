//! Palette generation from sprite frames
//!
//! Feeds a range of animation frames into one accumulator so a single
//! palette represents the whole sequence.

use crate::octree::{DEFAULT_MAX_DEPTH, Octree};
use crate::optimizer::{PaletteOptimizer, generate_around_mask, reserved_mask_slot};
use crate::task::{self, TaskDelegate, TaskStatus};
use crate::{RenderError, RenderResult};
use log::{info, trace};
use palquant_core::{Error, Image, MAX_PALETTE_SIZE, Palette};
use std::ops::Range;

/// Palette generation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantizeAlgorithm {
    /// Octree partition of the color cube
    Octree,
    /// Median cut over a fixed-resolution histogram
    #[default]
    Histogram,
}

/// Options for [`create_palette_from_frames`]
#[derive(Debug, Clone)]
pub struct PaletteOptions {
    /// Algorithm to use
    pub algorithm: QuantizeAlgorithm,
    /// Number of palette entries wanted (1..=256), used when no palette is
    /// passed in
    pub palette_size: usize,
    /// Whether alpha takes part in the quantization
    pub with_alpha: bool,
    /// Slot reserved for the transparent color
    pub mask_index: Option<usize>,
    /// Octree depth (1..=8); ignored by the histogram
    pub max_depth: u8,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            algorithm: QuantizeAlgorithm::Histogram,
            palette_size: MAX_PALETTE_SIZE,
            with_alpha: false,
            mask_index: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Build a palette from `frames[range]` into `palette`.
///
/// The length of `palette` is the number of entries wanted; an empty
/// palette asks for `options.palette_size` entries. Colors are generated
/// into a private buffer and only written to `palette` once every frame
/// was fed, so a canceled or failed run leaves it unchanged.
///
/// # Errors
///
/// Returns an error if the range is outside `frames`, the palette size or
/// octree depth is out of range, or a frame is indexed.
pub fn create_palette_from_frames(
    frames: &[Image],
    range: Range<usize>,
    options: &PaletteOptions,
    palette: &mut Palette,
    mut delegate: Option<&mut dyn TaskDelegate>,
) -> RenderResult<TaskStatus> {
    let size = if palette.is_empty() {
        options.palette_size
    } else {
        palette.len()
    };
    if size == 0 {
        return Err(RenderError::InvalidParameters(
            "palette size must be at least 1".into(),
        ));
    }
    let mut generated = Palette::new(size)?;
    let selected = frames.get(range.clone()).ok_or(Error::IndexOutOfBounds {
        index: range.end,
        len: frames.len(),
    })?;
    let with_alpha = options.with_alpha;

    match options.algorithm {
        QuantizeAlgorithm::Histogram => {
            let mut optimizer = PaletteOptimizer::new();
            let status = feed_frames(selected, range.start, &mut delegate, |frame| {
                optimizer.feed_with_image(frame, with_alpha)
            })?;
            if !status.is_completed() {
                return Ok(status);
            }
            optimizer.calculate(&mut generated, options.mask_index)?;
        }
        QuantizeAlgorithm::Octree => {
            let reserved = reserved_mask_slot(size, options.mask_index);
            let target = size - usize::from(reserved.is_some());
            let mut tree = Octree::new(target, options.max_depth, with_alpha)?;
            let status = feed_frames(selected, range.start, &mut delegate, |frame| {
                feed_octree(&mut tree, frame, with_alpha)
            })?;
            if !status.is_completed() {
                return Ok(status);
            }
            generate_around_mask(&mut generated, options.mask_index, |pal| {
                tree.generate_palette(pal)?;
                Ok(pal.len())
            })?;
        }
    }

    *palette = generated;
    Ok(TaskStatus::Completed)
}

#[cfg(feature = "parallel")]
fn feed_octree(tree: &mut Octree, frame: &Image, with_alpha: bool) -> RenderResult<()> {
    tree.feed_with_image_par(frame, with_alpha)
}

#[cfg(not(feature = "parallel"))]
fn feed_octree(tree: &mut Octree, frame: &Image, with_alpha: bool) -> RenderResult<()> {
    tree.feed_with_image(frame, with_alpha)
}

fn feed_frames(
    frames: &[Image],
    first: usize,
    delegate: &mut Option<&mut dyn TaskDelegate>,
    mut feed: impl FnMut(&Image) -> RenderResult<()>,
) -> RenderResult<TaskStatus> {
    for (i, frame) in frames.iter().enumerate() {
        trace!("palette: feeding frame {}", first + i);
        feed(frame)?;
        task::report(delegate, i + 1, frames.len());
        if task::canceled(delegate) {
            info!("palette generation canceled after frame {}", first + i);
            return Ok(TaskStatus::Canceled);
        }
    }
    Ok(TaskStatus::Completed)
}
