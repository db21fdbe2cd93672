//! Regression test parameters and operations

use palquant_core::{Image, Palette, color};

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Compare results, report only failures (default)
    #[default]
    Compare,
    /// Compare results and dump intermediate values
    Display,
}

impl RegTestMode {
    /// Parse mode from the `REGTEST_MODE` environment variable
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test parameters
///
/// This structure tracks the state of a regression test, including
/// the test name, current index, mode, and success status.
pub struct RegParams {
    /// Name of the test (e.g., "octree")
    pub test_name: String,
    /// Current test index (incremented before each check)
    index: usize,
    /// Test mode
    pub mode: RegTestMode,
    /// Overall success status
    success: bool,
    /// Recorded failures
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters
    ///
    /// The mode is taken from the `REGTEST_MODE` environment variable.
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current test index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn record_failure(&mut self, msg: String) {
        eprintln!("{}", msg);
        self.failures.push(msg);
        self.success = false;
    }

    /// Compare two floating-point values
    ///
    /// Returns `true` if `actual` is within `delta` of `expected`.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();

        if diff > delta {
            let msg = format!(
                "Failure in {}_reg: value comparison for index {}\n\
                 difference = {} but allowed delta = {}\n\
                 expected = {}, actual = {}",
                self.test_name, self.index, diff, delta, expected, actual
            );
            self.record_failure(msg);
            false
        } else {
            true
        }
    }

    /// Record a boolean check
    pub fn check(&mut self, condition: bool, what: &str) -> bool {
        self.index += 1;
        if !condition {
            let msg = format!(
                "Failure in {}_reg: check for index {} - {}",
                self.test_name, self.index, what
            );
            self.record_failure(msg);
        }
        condition
    }

    /// Compare two packed RGBA colors channel by channel
    ///
    /// Every channel of `actual` must be within `tolerance` of `expected`.
    pub fn compare_colors(&mut self, expected: u32, actual: u32, tolerance: u8) -> bool {
        self.index += 1;
        let (er, eg, eb, ea) = color::extract_rgba(expected);
        let (ar, ag, ab, aa) = color::extract_rgba(actual);
        let within = [(er, ar), (eg, ag), (eb, ab), (ea, aa)]
            .iter()
            .all(|&(e, a)| e.abs_diff(a) <= tolerance);

        if !within {
            let msg = format!(
                "Failure in {}_reg: color comparison for index {}\n\
                 expected = {:08x}, actual = {:08x}, tolerance = {}",
                self.test_name, self.index, expected, actual, tolerance
            );
            self.record_failure(msg);
        }
        within
    }

    /// Compare two images for exact equality
    pub fn compare_images(&mut self, image1: &Image, image2: &Image) -> bool {
        self.index += 1;

        if !image1.sizes_equal(image2) {
            let msg = format!(
                "Failure in {}_reg: image comparison for index {} - size or format mismatch",
                self.test_name, self.index
            );
            self.record_failure(msg);
            return false;
        }

        let width = image1.width();
        let mismatch = image1
            .data()
            .iter()
            .zip(image2.data())
            .position(|(p1, p2)| p1 != p2);

        if let Some(pos) = mismatch {
            let (x, y) = (pos as u32 % width, pos as u32 / width);
            let msg = format!(
                "Failure in {}_reg: image comparison for index {} - pixel mismatch at ({}, {})",
                self.test_name, self.index, x, y
            );
            self.record_failure(msg);
            return false;
        }

        true
    }

    /// Compare two palettes entry by entry
    pub fn compare_palettes(&mut self, expected: &Palette, actual: &Palette) -> bool {
        self.index += 1;

        if expected != actual {
            let msg = format!(
                "Failure in {}_reg: palette comparison for index {}\n\
                 expected = {:08x?}\n\
                 actual   = {:08x?}",
                self.test_name,
                self.index,
                expected.colors(),
                actual.colors()
            );
            self.record_failure(msg);
            false
        } else {
            true
        }
    }

    /// Print a palette in display mode
    pub fn show_palette(&self, label: &str, palette: &Palette) {
        if self.display() {
            eprintln!("  {} ({} entries):", label, palette.len());
            for (i, c) in palette.colors().iter().enumerate() {
                eprintln!("    [{:3}] {:08x}", i, c);
            }
        }
    }

    /// Clean up and report results
    ///
    /// Returns `true` if all checks passed, `false` if any failed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all tests have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}
