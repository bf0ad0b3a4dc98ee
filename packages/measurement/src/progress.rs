//! Progress hooks for long-running pipeline stages.
//!
//! [`crate::FeatureBuilder::build`] sizes its record pass with
//! [`ProgressCallback::set_total`] once the pesticide filter, recency
//! window, and cap have run, then advances one unit per record. The CLI
//! drives the same trait stage by stage while deriving views.

/// Sink for progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Number of units the current pass will report.
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Names what is being worked on.
    fn set_message(&self, msg: String);

    /// Marks the pass complete with a summary.
    fn finish(&self, msg: String);
}

/// Discards every update, for library callers without a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}

    fn inc(&self, _delta: u64) {}

    fn set_message(&self, _msg: String) {}

    fn finish(&self, _msg: String) {}
}
