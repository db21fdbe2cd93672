//! Octree node
//!
//! A node is one cell of the recursively subdivided color cube. Leaves
//! accumulate pixel statistics; internal nodes only route colors to their
//! children. Children are allocated the first time a color reaches them,
//! so sparse images never pay for the full `8^depth` tree.

use palquant_core::color;

/// Per-leaf population used to rank leaves when trimming a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtotalPixelsCount {
    color: u32,
    count: u64,
    sums: [u64; 4],
}

impl SubtotalPixelsCount {
    /// Create an entry for `count` pixels all of color `color`.
    pub fn new(color: u32, count: u64) -> Self {
        let (r, g, b, a) = color::extract_rgba(color);
        let sums = [r, g, b, a].map(|v| v as u64 * count);
        Self { color, count, sums }
    }

    /// Create an entry from accumulated channel sums.
    pub(crate) fn from_totals(color: u32, count: u64, sums: [u64; 4]) -> Self {
        Self { color, count, sums }
    }

    /// Per-channel sums (R, G, B, A) of the pixels in the leaf.
    pub fn sums(&self) -> [u64; 4] {
        self.sums
    }

    /// Average color of the leaf.
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Number of pixels that fell in the leaf.
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Result of [`Node::get_leaves_count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeavesCount {
    /// Number of non-empty leaves
    pub leaves: usize,
    /// Number of non-empty leaves left after one more
    /// [`Node::kill_last_level`]
    pub last_level: usize,
}

/// Octree node
///
/// A node is a leaf iff it has no children vector. Leaves are created at
/// level `max_depth - 1`; every internal node has 8 child slots, or 16
/// when the alpha channel takes part in the partition.
#[derive(Debug, Clone)]
pub struct Node {
    level: u8,
    max_depth: u8,
    with_alpha: bool,
    children: Option<Vec<Option<Box<Node>>>>,
    pixel_count: u64,
    sums: [u64; 4],
    palette_index: Option<usize>,
}

impl Node {
    /// Create an empty node at `level` of a tree `max_depth` levels deep.
    pub fn new(level: u8, max_depth: u8, with_alpha: bool) -> Self {
        let children = if level + 1 < max_depth {
            let slots = if with_alpha { 16 } else { 8 };
            Some(vec![None; slots])
        } else {
            None
        };
        Self {
            level,
            max_depth,
            with_alpha,
            children,
            pixel_count: 0,
            sums: [0; 4],
            palette_index: None,
        }
    }

    /// Depth of this node (0 for the root).
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Check whether this node accumulates statistics directly.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Pixels accumulated directly in this node (0 for internal nodes).
    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    /// Palette slot assigned by the last palette generation.
    pub fn palette_index(&self) -> Option<usize> {
        self.palette_index
    }

    /// Child slot a color takes at this node's level.
    ///
    /// Bit `7 - level` of red, green and blue selects one of 8 octants;
    /// the matching alpha bit doubles that to 16 when alpha is included.
    pub fn get_index(&self, c: u32) -> usize {
        let shift = 7 - self.level as u32;
        let (r, g, b, a) = color::extract_rgba(c);
        let bit = |v: u8| ((v as usize) >> shift) & 1;
        let mut index = (bit(r) << 2) | (bit(g) << 1) | bit(b);
        if self.with_alpha {
            index |= bit(a) << 3;
        }
        index
    }

    /// Child reached by `c`, if that branch has been allocated.
    pub fn child_for(&self, c: u32) -> Option<&Node> {
        let children = self.children.as_ref()?;
        children[self.get_index(c)].as_deref()
    }

    /// Add one pixel of color `c` below this node.
    pub fn add_color(&mut self, c: u32) {
        let index = self.get_index(c);
        let (level, max_depth, with_alpha) = (self.level, self.max_depth, self.with_alpha);
        match self.children.as_mut() {
            Some(children) => children[index]
                .get_or_insert_with(|| Box::new(Node::new(level + 1, max_depth, with_alpha)))
                .add_color(c),
            None => {
                let (r, g, b, a) = color::extract_rgba(c);
                self.pixel_count += 1;
                self.sums[0] += r as u64;
                self.sums[1] += g as u64;
                self.sums[2] += b as u64;
                self.sums[3] += a as u64;
            }
        }
    }

    /// Pixel count and channel sums of this node and all its descendants.
    pub fn totals(&self) -> (u64, [u64; 4]) {
        match &self.children {
            None => (self.pixel_count, self.sums),
            Some(children) => {
                children
                    .iter()
                    .flatten()
                    .fold((0, [0; 4]), |(count, mut sums), child| {
                        let (n, s) = child.totals();
                        for (acc, v) in sums.iter_mut().zip(s) {
                            *acc += v;
                        }
                        (count + n, sums)
                    })
            }
        }
    }

    /// Average color of the pixels below this node.
    ///
    /// Returns `None` for a node no pixel reached. Alpha is reported as
    /// opaque when the tree does not partition on alpha.
    pub fn get_color(&self) -> Option<u32> {
        let (count, sums) = self.totals();
        if count == 0 {
            return None;
        }
        let avg = |i: usize| (sums[i] / count) as u8;
        let a = if self.with_alpha { avg(3) } else { 255 };
        Some(color::compose_rgba(avg(0), avg(1), avg(2), a))
    }

    /// Count the non-empty leaves below this node.
    pub fn get_leaves_count(&self) -> LeavesCount {
        let Some(children) = &self.children else {
            let n = usize::from(self.pixel_count > 0);
            return LeavesCount {
                leaves: n,
                last_level: n,
            };
        };

        let mut total = LeavesCount::default();
        let mut parent_of_leaves = true;
        for child in children.iter().flatten() {
            let count = child.get_leaves_count();
            total.leaves += count.leaves;
            total.last_level += count.last_level;
            parent_of_leaves &= child.is_leaf();
        }
        if parent_of_leaves {
            total.last_level = usize::from(total.leaves > 0);
        }
        total
    }

    /// Collapse the deepest level of leaves into their parents.
    ///
    /// Each parent of leaves becomes a leaf holding the summed statistics
    /// of its former children. Returns `false` if this node is already a
    /// leaf and nothing changed.
    pub fn kill_last_level(&mut self) -> bool {
        let Some(children) = self.children.as_mut() else {
            return false;
        };

        if children.iter().flatten().any(|child| !child.is_leaf()) {
            let mut killed = false;
            for child in children.iter_mut().flatten() {
                killed |= child.kill_last_level();
            }
            return killed;
        }

        let (count, sums) = self.totals();
        self.children = None;
        self.pixel_count = count;
        self.sums = sums;
        true
    }

    /// Append one entry per non-empty leaf, depth first in child order.
    pub fn fill_subtotal_vector(&self, out: &mut Vec<SubtotalPixelsCount>) {
        match &self.children {
            None => {
                if let Some(color) = self.get_color() {
                    out.push(SubtotalPixelsCount::from_totals(
                        color,
                        self.pixel_count,
                        self.sums,
                    ));
                }
            }
            Some(children) => {
                for child in children.iter().flatten() {
                    child.fill_subtotal_vector(out);
                }
            }
        }
    }

    /// Fold the statistics of `other` into this node, leaf by leaf.
    ///
    /// Both nodes are expected to sit at the same level with leaves at
    /// the same depth. If `other` is a leaf where this node is not, this
    /// node is collapsed first so no pixel is lost.
    pub fn merge(&mut self, other: Node) {
        if let Some(mine) = self.children.as_mut()
            && other.children.is_some()
        {
            let theirs = other.children.into_iter().flatten();
            for (slot, their_child) in mine.iter_mut().zip(theirs) {
                let Some(their_child) = their_child else {
                    continue;
                };
                match slot {
                    Some(my_child) => my_child.merge(*their_child),
                    None => *slot = Some(their_child),
                }
            }
            return;
        }

        let (count, sums) = other.totals();
        let (my_count, my_sums) = self.totals();
        self.children = None;
        self.pixel_count = my_count + count;
        for ((acc, mine), theirs) in self.sums.iter_mut().zip(my_sums).zip(sums) {
            *acc = mine + theirs;
        }
    }

    /// Give every non-empty leaf the next slot from `slots`, depth first.
    pub(crate) fn assign_palette_indices(&mut self, slots: &mut impl Iterator<Item = usize>) {
        match self.children.as_mut() {
            None => {
                self.palette_index = if self.pixel_count > 0 {
                    slots.next()
                } else {
                    None
                };
            }
            Some(children) => {
                for child in children.iter_mut().flatten() {
                    child.assign_palette_indices(slots);
                }
            }
        }
    }
}
