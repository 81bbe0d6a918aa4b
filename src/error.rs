use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Everything else (closed ports, failed baselines, per-credential attempt
/// failures) is absorbed inside the layer that observes it; cancellation is
/// the one condition that propagates through every layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The shared cancellation signal fired while work was in flight
    #[error("scan cancelled")]
    Cancelled,

    /// `scan` was called after `shutdown`; a programmer error, not a
    /// condition to retry
    #[error("scan engine has been shut down")]
    EngineClosed,
}
