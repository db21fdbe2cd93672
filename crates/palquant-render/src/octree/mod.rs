//! Octree color quantization
//!
//! The color cube is partitioned by successive most-significant bit planes
//! of each channel. Pixels are accumulated in the leaves; generating a
//! palette prunes the tree until it has at most the target number of
//! leaves and emits the average color of each one.
//!
//! # Pruning policy
//!
//! 1. Whole levels are collapsed ([`Node::kill_last_level`]) while the
//!    tree has too many leaves and collapsing would still leave at least
//!    the target count.
//! 2. The remaining excess is trimmed leaf by leaf: the least populated
//!    leaf (earliest in traversal order on ties) is merged into the
//!    nearest remaining leaf (smaller population, then traversal order on
//!    ties).
//!
//! The result depends only on the accumulated statistics, so feeding the
//! same pixels in any order, or merging partial trees, gives the same
//! palette.

mod node;

pub use node::{LeavesCount, Node, SubtotalPixelsCount};

use crate::pixels::for_each_color;
use crate::{RenderError, RenderResult};
use log::debug;
use palquant_core::{Image, MAX_PALETTE_SIZE, Palette, color};

/// Deepest supported tree (one level per bit of a channel).
pub const MAX_DEPTH: u8 = 8;

/// Depth used when none is given.
pub const DEFAULT_MAX_DEPTH: u8 = 6;

/// Octree quantizer
#[derive(Debug, Clone)]
pub struct Octree {
    root: Node,
    target: usize,
    max_depth: u8,
    with_alpha: bool,
    leaf_level: u8,
    palette: Vec<u32>,
}

impl Octree {
    /// Create an empty tree producing at most `target` colors.
    ///
    /// When `with_alpha` is true the alpha channel takes part in the
    /// partition and every node has 16 children instead of 8.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidParameters`] if `target` is not in
    /// `1..=256` or `max_depth` is not in `1..=8`.
    pub fn new(target: usize, max_depth: u8, with_alpha: bool) -> RenderResult<Self> {
        if target == 0 || target > MAX_PALETTE_SIZE {
            return Err(RenderError::InvalidParameters(format!(
                "target palette size must be between 1 and {MAX_PALETTE_SIZE}; got {target}"
            )));
        }
        if !(1..=MAX_DEPTH).contains(&max_depth) {
            return Err(RenderError::InvalidParameters(format!(
                "max_depth must be between 1 and {MAX_DEPTH}; got {max_depth}"
            )));
        }
        Ok(Self {
            root: Node::new(0, max_depth, with_alpha),
            target,
            max_depth,
            with_alpha,
            leaf_level: max_depth - 1,
            palette: Vec::new(),
        })
    }

    /// Maximum number of colors the generated palette may hold.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Configured tree depth.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Check whether alpha takes part in the partition.
    pub fn with_alpha(&self) -> bool {
        self.with_alpha
    }

    /// Root of the tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Accumulate every visible pixel of `image`.
    ///
    /// Can be called once per animation frame to build a single palette
    /// for the whole sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnsupportedFormat`] for indexed images.
    pub fn feed_with_image(&mut self, image: &Image, with_alpha: bool) -> RenderResult<()> {
        let root = &mut self.root;
        for_each_color(image, 0..image.height(), with_alpha, |c| root.add_color(c))
    }

    /// Accumulate `image` on the rayon pool.
    ///
    /// Row bands are accumulated into private trees which are then merged
    /// into this one; the result is identical to [`feed_with_image`].
    ///
    /// [`feed_with_image`]: Octree::feed_with_image
    #[cfg(feature = "parallel")]
    pub fn feed_with_image_par(&mut self, image: &Image, with_alpha: bool) -> RenderResult<()> {
        use rayon::prelude::*;

        let height = image.height();
        let bands = (rayon::current_num_threads() as u32).clamp(1, height.max(1));
        let rows_per_band = height.div_ceil(bands);
        let (target, max_depth, tree_alpha) = (self.target, self.max_depth, self.with_alpha);

        let partials = (0..bands)
            .into_par_iter()
            .map(|band| -> RenderResult<Octree> {
                let start = band * rows_per_band;
                let mut tree = Octree::new(target, max_depth, tree_alpha)?;
                let root = &mut tree.root;
                for_each_color(image, start..start + rows_per_band, with_alpha, |c| {
                    root.add_color(c)
                })?;
                Ok(tree)
            })
            .collect::<RenderResult<Vec<_>>>()?;

        for partial in partials {
            self.merge(partial)?;
        }
        Ok(())
    }

    /// Accumulate one pixel.
    pub fn add_color(&mut self, c: u32) {
        self.root.add_color(c);
    }

    /// Fold an independently accumulated tree into this one.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IncompatibleMerge`] if the trees differ in
    /// depth, alpha partitioning or pruning state.
    pub fn merge(&mut self, other: Octree) -> RenderResult<()> {
        if other.max_depth != self.max_depth
            || other.with_alpha != self.with_alpha
            || other.leaf_level != self.leaf_level
        {
            return Err(RenderError::IncompatibleMerge(format!(
                "octree depth {}/{} alpha {} cannot merge depth {}/{} alpha {}",
                self.max_depth,
                self.leaf_level,
                self.with_alpha,
                other.max_depth,
                other.leaf_level,
                other.with_alpha
            )));
        }
        self.root.merge(other.root);
        Ok(())
    }

    /// Count the non-empty leaves of the tree.
    pub fn leaves_count(&self) -> LeavesCount {
        self.root.get_leaves_count()
    }

    /// Collapse the deepest level of the tree. Returns `false` once the
    /// root is the only leaf.
    pub fn kill_last_level(&mut self) -> bool {
        let killed = self.root.kill_last_level();
        if killed {
            self.leaf_level = self.leaf_level.saturating_sub(1);
        }
        killed
    }

    /// Prune the tree and write one color per surviving leaf to `palette`.
    ///
    /// The palette is resized to the number of colors produced, which is
    /// at most [`target`](Self::target) and may be zero when no visible
    /// pixel was fed.
    pub fn generate_palette(&mut self, palette: &mut Palette) -> RenderResult<()> {
        let mut count = self.leaves_count();
        while count.leaves > self.target && count.last_level >= self.target {
            if !self.kill_last_level() {
                break;
            }
            debug!(
                "octree: collapsed to level {} ({} -> {} leaves)",
                self.leaf_level, count.leaves, count.last_level
            );
            count = self.leaves_count();
        }

        let mut subtotals = Vec::with_capacity(count.leaves);
        self.root.fill_subtotal_vector(&mut subtotals);
        let trimmed = trim_leaves(&subtotals, self.target, self.with_alpha);
        if trimmed.colors.len() < subtotals.len() {
            debug!(
                "octree: trimmed {} leaves to {} colors",
                subtotals.len(),
                trimmed.colors.len()
            );
        }

        self.root
            .assign_palette_indices(&mut trimmed.slot_of_leaf.iter().copied());
        *palette = Palette::from_colors(trimmed.colors.clone())?;
        self.palette = trimmed.colors;
        Ok(())
    }

    /// Colors produced by the last [`generate_palette`](Self::generate_palette).
    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    /// Palette slot of the leaf `c` falls in.
    ///
    /// Returns `None` before a palette was generated or when `c` lies in a
    /// part of the color cube no fed pixel reached.
    pub fn palette_index(&self, c: u32) -> Option<usize> {
        let mut node = &self.root;
        while !node.is_leaf() {
            node = node.child_for(c)?;
        }
        node.palette_index()
    }
}

/// Outcome of trimming the flattened leaves to the target size.
struct TrimmedLeaves {
    /// Surviving colors in traversal order
    colors: Vec<u32>,
    /// Final palette slot of each input leaf
    slot_of_leaf: Vec<usize>,
}

struct Cluster {
    count: u64,
    sums: [u64; 4],
    color: u32,
    merged_into: Option<usize>,
}

fn trim_leaves(subtotals: &[SubtotalPixelsCount], target: usize, with_alpha: bool) -> TrimmedLeaves {
    let mut clusters: Vec<Cluster> = subtotals
        .iter()
        .map(|s| Cluster {
            count: s.count(),
            sums: s.sums(),
            color: s.color(),
            merged_into: None,
        })
        .collect();

    let mut alive = clusters.len();
    while alive > target.max(1) {
        let Some(victim) = clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.merged_into.is_none())
            .min_by_key(|(i, c)| (c.count, *i))
            .map(|(i, _)| i)
        else {
            break;
        };
        let victim_color = clusters[victim].color;
        let Some(host) = clusters
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != victim && c.merged_into.is_none())
            .min_by_key(|(i, c)| (color::distance_sq(victim_color, c.color), c.count, *i))
            .map(|(i, _)| i)
        else {
            break;
        };

        // Sums stay exact; only the ranking color is rounded.
        let (victim_count, victim_sums) = (clusters[victim].count, clusters[victim].sums);
        let merged = &mut clusters[host];
        merged.count += victim_count;
        for (acc, v) in merged.sums.iter_mut().zip(victim_sums) {
            *acc += v;
        }
        merged.color = average(merged.count, merged.sums, with_alpha);
        clusters[victim].merged_into = Some(host);
        alive -= 1;
    }

    let mut slot_of_cluster = vec![0usize; clusters.len()];
    let mut colors = Vec::with_capacity(alive);
    for (i, cluster) in clusters.iter().enumerate() {
        if cluster.merged_into.is_none() {
            slot_of_cluster[i] = colors.len();
            colors.push(cluster.color);
        }
    }
    let slot_of_leaf = (0..clusters.len())
        .map(|mut i| {
            while let Some(next) = clusters[i].merged_into {
                i = next;
            }
            slot_of_cluster[i]
        })
        .collect();

    TrimmedLeaves {
        colors,
        slot_of_leaf,
    }
}

/// Mean color of `count` pixels with the given channel sums.
fn average(count: u64, sums: [u64; 4], with_alpha: bool) -> u32 {
    let count = count.max(1);
    let [r, g, b, a] = sums.map(|s| (s / count) as u8);
    color::compose_rgba(r, g, b, if with_alpha { a } else { 255 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use palquant_core::color::{compose_rgb, compose_rgba};

    #[test]
    fn test_new_validates_config() {
        assert!(Octree::new(0, 6, false).is_err());
        assert!(Octree::new(257, 6, false).is_err());
        assert!(Octree::new(16, 0, false).is_err());
        assert!(Octree::new(16, 9, false).is_err());
        let tree = Octree::new(16, 8, true).unwrap();
        assert_eq!(tree.target(), 16);
        assert_eq!(tree.max_depth(), 8);
        assert!(tree.with_alpha());
    }

    #[test]
    fn test_four_pixel_scenario() {
        let mut tree = Octree::new(2, 6, false).unwrap();
        for c in [
            compose_rgb(255, 0, 0),
            compose_rgb(255, 0, 0),
            compose_rgb(0, 255, 0),
            compose_rgb(0, 0, 255),
        ] {
            tree.add_color(c);
        }
        let mut pal = Palette::default();
        tree.generate_palette(&mut pal).unwrap();

        assert_eq!(pal.len(), 2);
        assert!(pal.colors().contains(&compose_rgb(255, 0, 0)));
        assert!(pal.colors().contains(&compose_rgb(0, 127, 127)));
        assert_eq!(tree.palette(), pal.colors());
    }

    #[test]
    fn test_single_color() {
        let mut tree = Octree::new(8, 6, false).unwrap();
        for _ in 0..10 {
            tree.add_color(compose_rgb(12, 34, 56));
        }
        let mut pal = Palette::default();
        tree.generate_palette(&mut pal).unwrap();
        assert_eq!(pal.colors(), &[compose_rgb(12, 34, 56)]);
        assert_eq!(tree.palette_index(compose_rgb(12, 34, 56)), Some(0));
    }

    #[test]
    fn test_empty_tree_gives_empty_palette() {
        let mut tree = Octree::new(8, 6, false).unwrap();
        let mut pal = Palette::new(4).unwrap();
        tree.generate_palette(&mut pal).unwrap();
        assert!(pal.is_empty());
        assert_eq!(tree.palette_index(compose_rgb(1, 2, 3)), None);
    }

    #[test]
    fn test_depth_one_is_single_average() {
        let mut tree = Octree::new(4, 1, false).unwrap();
        tree.add_color(compose_rgb(0, 0, 0));
        tree.add_color(compose_rgb(200, 100, 50));
        let mut pal = Palette::default();
        tree.generate_palette(&mut pal).unwrap();
        assert_eq!(pal.colors(), &[compose_rgb(100, 50, 25)]);
    }

    #[test]
    fn test_palette_index_follows_merges() {
        let mut tree = Octree::new(2, 6, false).unwrap();
        for c in [
            compose_rgb(255, 0, 0),
            compose_rgb(255, 0, 0),
            compose_rgb(0, 255, 0),
            compose_rgb(0, 0, 255),
        ] {
            tree.add_color(c);
        }
        let mut pal = Palette::default();
        tree.generate_palette(&mut pal).unwrap();

        let green = tree.palette_index(compose_rgb(0, 255, 0)).unwrap();
        let blue = tree.palette_index(compose_rgb(0, 0, 255)).unwrap();
        let red = tree.palette_index(compose_rgb(255, 0, 0)).unwrap();
        assert_eq!(green, blue);
        assert_ne!(green, red);
        assert_eq!(pal.entry(red), Some(compose_rgb(255, 0, 0)));
    }

    #[test]
    fn test_alpha_partition_keeps_translucent_colors_apart() {
        let mut tree = Octree::new(4, 4, true).unwrap();
        tree.add_color(compose_rgba(255, 0, 0, 255));
        tree.add_color(compose_rgba(255, 0, 0, 64));
        let mut pal = Palette::default();
        tree.generate_palette(&mut pal).unwrap();
        assert_eq!(pal.len(), 2);
        assert!(pal.colors().contains(&compose_rgba(255, 0, 0, 64)));
    }

    #[test]
    fn test_merge_rejects_mismatched_trees() {
        let mut a = Octree::new(8, 6, false).unwrap();
        assert!(a.merge(Octree::new(8, 5, false).unwrap()).is_err());
        assert!(a.merge(Octree::new(8, 6, true).unwrap()).is_err());

        let mut pruned = Octree::new(8, 6, false).unwrap();
        pruned.add_color(compose_rgb(1, 1, 1));
        pruned.kill_last_level();
        assert!(a.merge(pruned).is_err());
        assert!(a.merge(Octree::new(8, 6, false).unwrap()).is_ok());
    }

    #[test]
    fn test_trim_prefers_smallest_and_nearest() {
        let subtotals = [
            SubtotalPixelsCount::new(compose_rgb(0, 0, 0), 10),
            SubtotalPixelsCount::new(compose_rgb(250, 250, 250), 1),
            SubtotalPixelsCount::new(compose_rgb(255, 255, 255), 5),
        ];
        let trimmed = trim_leaves(&subtotals, 2, false);
        assert_eq!(trimmed.colors.len(), 2);
        assert_eq!(trimmed.slot_of_leaf, vec![0, 1, 1]);
        // (250 * 1 + 255 * 5) / 6 = 254
        assert_eq!(trimmed.colors[1], compose_rgb(254, 254, 254));
    }

    #[test]
    fn test_trim_divides_once() {
        // Averaging the averages would give 0 after both merges.
        let subtotals = [
            SubtotalPixelsCount::new(compose_rgb(0, 0, 0), 1),
            SubtotalPixelsCount::new(compose_rgb(1, 1, 1), 1),
            SubtotalPixelsCount::new(compose_rgb(2, 2, 2), 1),
        ];
        let trimmed = trim_leaves(&subtotals, 1, false);
        assert_eq!(trimmed.colors, vec![compose_rgb(1, 1, 1)]);
        assert_eq!(trimmed.slot_of_leaf, vec![0, 0, 0]);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(4, [100, 200, 40, 1020], false), compose_rgb(25, 50, 10));
        assert_eq!(average(4, [100, 200, 40, 400], true), compose_rgba(25, 50, 10, 100));
    }
}
