//! Progress and cancellation for long-running passes
//!
//! Quantizing every frame of a sprite or converting a large image can take
//! long enough that a UI wants to show progress and let the user abort.
//! Those passes poll a [`TaskDelegate`] at frame and row boundaries.

/// Observer of a long-running pass.
///
/// Cancellation is cooperative: the pass checks [`is_canceled`] before
/// each unit of work and stops cleanly when it returns `true`.
///
/// [`is_canceled`]: TaskDelegate::is_canceled
pub trait TaskDelegate {
    /// Return `true` to stop the pass at the next checkpoint.
    fn is_canceled(&self) -> bool;

    /// Called after each unit of work with the completed fraction in `0.0..=1.0`.
    fn report_progress(&mut self, fraction: f64);
}

/// Terminal state of a pass that can be canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Every unit of work was processed
    Completed,
    /// The delegate asked to stop before the end
    Canceled,
}

impl TaskStatus {
    /// Check whether the pass ran to the end.
    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }
}

/// Poll the delegate, if any. Returns `true` when the pass must stop.
pub(crate) fn canceled(delegate: &Option<&mut dyn TaskDelegate>) -> bool {
    delegate.as_ref().is_some_and(|d| d.is_canceled())
}

/// Forward progress to the delegate, if any.
pub(crate) fn report(delegate: &mut Option<&mut dyn TaskDelegate>, done: usize, total: usize) {
    if let Some(d) = delegate.as_mut() {
        d.report_progress(done as f64 / total.max(1) as f64);
    }
}
