//! Fixed-resolution color histogram
//!
//! Colors are binned by keeping the top `R`, `G`, `B` and `A` bits of each
//! channel. The histogram also remembers the exact colors it has seen as
//! long as there are few enough of them to fill a palette directly.
//!
//! Palettes are derived by median cut over the non-empty bins.

use crate::RenderResult;
use log::debug;
use palquant_core::{MAX_PALETTE_SIZE, Palette, color};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

/// Histogram over `R:G:B:A` bit-quantized colors.
///
/// Each width must be in `1..=8`.
#[derive(Debug, Clone)]
pub struct ColorHistogram<const R: u32, const G: u32, const B: u32, const A: u32> {
    bins: Vec<u32>,
    exact: BTreeSet<u32>,
    exact_mode: bool,
}

impl<const R: u32, const G: u32, const B: u32, const A: u32> Default
    for ColorHistogram<R, G, B, A>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const R: u32, const G: u32, const B: u32, const A: u32> ColorHistogram<R, G, B, A> {
    const BITS: [u32; 4] = [R, G, B, A];
    const SIZE: usize = 1 << (R + G + B + A);

    /// Create an empty histogram.
    pub fn new() -> Self {
        Self {
            bins: vec![0; Self::SIZE],
            exact: BTreeSet::new(),
            exact_mode: true,
        }
    }

    /// Bin that `c` falls in.
    pub fn bin_index(c: u32) -> usize {
        let (r, g, b, a) = color::extract_rgba(c);
        let q = |v: u8, bits: u32| (v as usize) >> (8 - bits);
        (q(r, R) << (G + B + A)) | (q(g, G) << (B + A)) | (q(b, B) << A) | q(a, A)
    }

    fn bin_coords(index: usize) -> [u8; 4] {
        let field = |shift: u32, bits: u32| ((index >> shift) & ((1 << bits) - 1)) as u8;
        [
            field(G + B + A, R),
            field(B + A, G),
            field(A, B),
            field(0, A),
        ]
    }

    /// Count `count` more samples of `c`. Bins saturate at `u32::MAX`.
    pub fn add_samples(&mut self, c: u32, count: u32) {
        if count == 0 {
            return;
        }
        let bin = &mut self.bins[Self::bin_index(c)];
        *bin = bin.saturating_add(count);

        if self.exact_mode {
            self.exact.insert(c);
            if self.exact.len() > MAX_PALETTE_SIZE {
                debug!("histogram: more than {MAX_PALETTE_SIZE} colors, leaving exact mode");
                self.exact_mode = false;
                self.exact.clear();
            }
        }
    }

    /// Samples counted in the bin `c` falls in.
    pub fn count(&self, c: u32) -> u32 {
        self.bins[Self::bin_index(c)]
    }

    /// Check whether every color seen so far is still known exactly.
    pub fn is_exact(&self) -> bool {
        self.exact_mode
    }

    /// Number of bins holding at least one sample.
    pub fn used_bins(&self) -> usize {
        self.bins.iter().filter(|&&n| n > 0).count()
    }

    /// Add the samples of `other` to this histogram.
    pub fn merge(&mut self, other: &Self) {
        for (mine, &theirs) in self.bins.iter_mut().zip(&other.bins) {
            *mine = mine.saturating_add(theirs);
        }
        if self.exact_mode && other.exact_mode {
            self.exact.extend(other.exact.iter().copied());
            if self.exact.len() > MAX_PALETTE_SIZE {
                self.exact_mode = false;
                self.exact.clear();
            }
        } else {
            self.exact_mode = false;
            self.exact.clear();
        }
    }

    /// Fill the leading entries of `palette` with representative colors.
    ///
    /// At most `palette.len()` colors are written; the rest of the palette
    /// is left as it was. Returns the number of colors written.
    ///
    /// # Errors
    ///
    /// Propagates a failed palette write; with at most `palette.len()`
    /// colors produced this does not happen.
    pub fn create_optimized_palette(&self, palette: &mut Palette) -> RenderResult<usize> {
        let target = palette.len();
        if target == 0 {
            return Ok(0);
        }

        let colors: Vec<u32> = if self.exact_mode && self.exact.len() <= target {
            debug!("histogram: using {} exact colors", self.exact.len());
            self.exact.iter().copied().collect()
        } else {
            let colors = self.median_cut(target);
            debug!(
                "histogram: median cut of {} bins into {} colors",
                self.used_bins(),
                colors.len()
            );
            colors
        };

        for (i, &c) in colors.iter().take(target).enumerate() {
            palette.set_entry(i, c)?;
        }
        Ok(colors.len().min(target))
    }

    fn median_cut(&self, target: usize) -> Vec<u32> {
        let bins: Vec<Bin> = self
            .bins
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(i, &n)| Bin {
                coords: Self::bin_coords(i),
                count: n as u64,
            })
            .collect();
        if bins.is_empty() {
            return Vec::new();
        }

        let mut boxes = BinaryHeap::new();
        let mut done = Vec::new();
        boxes.push(ColorBox::new(bins, Self::BITS));

        while boxes.len() + done.len() < target {
            let Some(box_) = boxes.pop() else {
                break;
            };
            match box_.split() {
                Ok((box1, box2)) => {
                    boxes.push(box1);
                    boxes.push(box2);
                }
                Err(whole) => done.push(whole),
            }
        }
        done.extend(boxes);

        let mut colors: Vec<u32> = done.iter().map(ColorBox::mean_color).collect();
        colors.sort_unstable();
        colors
    }
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    coords: [u8; 4],
    count: u64,
}

/// A box of histogram bins
#[derive(Debug)]
struct ColorBox {
    bins: Vec<Bin>,
    bits: [u32; 4],
    min: [u8; 4],
    max: [u8; 4],
    population: u64,
}

impl ColorBox {
    fn new(bins: Vec<Bin>, bits: [u32; 4]) -> Self {
        let mut min = [u8::MAX; 4];
        let mut max = [0u8; 4];
        let mut population = 0u64;
        for bin in &bins {
            for ch in 0..4 {
                min[ch] = min[ch].min(bin.coords[ch]);
                max[ch] = max[ch].max(bin.coords[ch]);
            }
            population += bin.count;
        }
        Self {
            bins,
            bits,
            min,
            max,
            population,
        }
    }

    fn volume(&self) -> u64 {
        (0..4)
            .map(|ch| (self.max[ch] - self.min[ch]) as u64 + 1)
            .product()
    }

    fn priority(&self) -> u64 {
        self.population.saturating_mul(self.volume())
    }

    /// Channel with the largest extent in 8-bit units, if any has extent.
    fn widest_channel(&self) -> Option<usize> {
        let extent = |ch: usize| ((self.max[ch] - self.min[ch]) as u32) << (8 - self.bits[ch]);
        (0..4)
            .filter(|&ch| extent(ch) > 0)
            .max_by(|&a, &b| extent(a).cmp(&extent(b)).then(b.cmp(&a)))
    }

    fn split(mut self) -> Result<(ColorBox, ColorBox), ColorBox> {
        if self.bins.len() < 2 {
            return Err(self);
        }
        let Some(ch) = self.widest_channel() else {
            return Err(self);
        };

        self.bins.sort_by_key(|bin| bin.coords[ch]);

        // Weighted median
        let half = self.population.div_ceil(2);
        let mut acc = 0u64;
        let mut mid = self.bins.len() - 1;
        for (i, bin) in self.bins.iter().enumerate() {
            acc += bin.count;
            if acc >= half {
                mid = i + 1;
                break;
            }
        }
        let mid = mid.clamp(1, self.bins.len() - 1);

        let upper = self.bins.split_off(mid);
        Ok((
            ColorBox::new(self.bins, self.bits),
            ColorBox::new(upper, self.bits),
        ))
    }

    /// Population-weighted mean of the bins, scaled to 8 bits per channel.
    fn mean_color(&self) -> u32 {
        let mut sums = [0u64; 4];
        for bin in &self.bins {
            for ch in 0..4 {
                sums[ch] += bin.coords[ch] as u64 * bin.count;
            }
        }
        let pop = self.population.max(1);
        let channel = |ch: usize| {
            let max = (1u64 << self.bits[ch]) - 1;
            ((sums[ch] * 255 + pop * max / 2) / (pop * max)) as u8
        };
        color::compose_rgba(channel(0), channel(1), channel(2), channel(3))
    }
}

impl PartialEq for ColorBox {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ColorBox {}

impl Ord for ColorBox {
    fn cmp(&self, other: &Self) -> Ordering {
        // Largest population * volume first; lower corner breaks ties.
        self.priority()
            .cmp(&other.priority())
            .then_with(|| other.min.cmp(&self.min))
    }
}

impl PartialOrd for ColorBox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palquant_core::color::{compose_rgb, compose_rgba};

    type Hist = ColorHistogram<5, 6, 5, 5>;

    #[test]
    fn test_bin_index() {
        assert_eq!(Hist::bin_index(0), 0);
        assert_eq!(Hist::bin_index(0xffff_ffff), (1 << 21) - 1);
        assert_eq!(Hist::bin_index(compose_rgba(0, 0, 0, 0xf8)), 31);
        assert_eq!(Hist::bin_index(compose_rgba(0, 0, 0, 0x07)), 0);
        assert_eq!(Hist::bin_coords(Hist::bin_index(compose_rgb(255, 4, 8))), [31, 1, 1, 31]);
    }

    #[test]
    fn test_saturating_bins() {
        let mut hist = ColorHistogram::<1, 1, 1, 1>::new();
        hist.add_samples(compose_rgb(1, 2, 3), u32::MAX);
        hist.add_samples(compose_rgb(1, 2, 3), 5);
        assert_eq!(hist.count(compose_rgb(1, 2, 3)), u32::MAX);
    }

    #[test]
    fn test_writes_only_leading_entries() {
        let mut hist = Hist::new();
        hist.add_samples(compose_rgb(9, 9, 9), 1);
        hist.add_samples(compose_rgb(90, 90, 90), 1);

        let marker = compose_rgb(1, 2, 3);
        let mut pal = Palette::from_colors(vec![marker; 4]).unwrap();
        assert_eq!(hist.create_optimized_palette(&mut pal).unwrap(), 2);
        assert_eq!(
            pal.colors(),
            &[compose_rgb(9, 9, 9), compose_rgb(90, 90, 90), marker, marker]
        );
    }

    #[test]
    fn test_exact_mode_palette() {
        let mut hist = Hist::new();
        hist.add_samples(compose_rgb(200, 1, 1), 3);
        hist.add_samples(compose_rgb(1, 200, 1), 1);
        hist.add_samples(compose_rgb(201, 1, 1), 1);

        let mut pal = Palette::new(8).unwrap();
        let n = hist.create_optimized_palette(&mut pal).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            &pal.colors()[..3],
            &[compose_rgb(1, 200, 1), compose_rgb(200, 1, 1), compose_rgb(201, 1, 1)]
        );
        // Untouched tail
        assert_eq!(pal.entry(3), Some(0x0000_00ff));
    }

    #[test]
    fn test_exact_mode_turns_off() {
        let mut hist = Hist::new();
        for i in 0..=256u32 {
            hist.add_samples(compose_rgb((i % 256) as u8, (i / 256) as u8, 0), 1);
        }
        assert!(!hist.is_exact());
    }

    #[test]
    fn test_median_cut_two_clusters() {
        let mut hist = Hist::new();
        for v in 0..40u8 {
            hist.add_samples(compose_rgb(v, v, v), 10);
            hist.add_samples(compose_rgb(255 - v, 0, 0), 10);
        }
        assert!(hist.is_exact());

        let mut pal = Palette::new(2).unwrap();
        assert_eq!(hist.create_optimized_palette(&mut pal).unwrap(), 2);
        let dark = pal.entry(0).unwrap();
        let red = pal.entry(1).unwrap();
        assert!(color::red(dark) < 48 && color::green(dark) < 48);
        assert!(color::red(red) > 200 && color::green(red) == 0);
        assert_eq!(color::alpha(red), 255);
    }

    #[test]
    fn test_median_cut_respects_target() {
        let mut hist = Hist::new();
        for r in (0..=255u32).step_by(8) {
            for g in (0..=255u32).step_by(16) {
                hist.add_samples(compose_rgb(r as u8, g as u8, 77), 1);
            }
        }
        for target in [1, 7, 16, 255] {
            let mut pal = Palette::new(target).unwrap();
            let n = hist.create_optimized_palette(&mut pal).unwrap();
            assert!(n >= 1 && n <= target);
        }
    }

    #[test]
    fn test_single_bin_gives_one_color() {
        let mut hist = Hist::new();
        for v in 0..16u32 {
            // 16 distinct colors, all inside one bin.
            hist.add_samples(compose_rgb(8 + (v % 4) as u8, 4 + (v / 4 % 4) as u8, 8), 1);
        }
        let mut pal = Palette::new(8).unwrap();
        assert_eq!(hist.create_optimized_palette(&mut pal).unwrap(), 1);
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Hist::new();
        let mut pal = Palette::new(4).unwrap();
        assert_eq!(hist.create_optimized_palette(&mut pal).unwrap(), 0);
    }

    #[test]
    fn test_merge() {
        let mut a = Hist::new();
        let mut b = Hist::new();
        a.add_samples(compose_rgb(10, 20, 30), 2);
        b.add_samples(compose_rgb(10, 20, 30), 3);
        b.add_samples(compose_rgb(99, 0, 0), 1);
        a.merge(&b);
        assert_eq!(a.count(compose_rgb(10, 20, 30)), 5);
        assert_eq!(a.used_bins(), 2);
        assert!(a.is_exact());
    }
}
