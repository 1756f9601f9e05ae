//! Progress reporting for chunk processing.
//!
//! The orchestrator reports products processed through
//! [`ProgressCallback`] so callers can render a bar, log, or stay silent.

/// Receives progress updates from a running chunk.
///
/// Implementations must be `Send + Sync`; updates arrive from whichever
/// task finishes a sub-chunk.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}
