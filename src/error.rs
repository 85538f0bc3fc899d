use thiserror::Error;

/// Errors surfaced by the public API of [`crate::Fmp4Stream`].
///
/// Per-chunk parse problems (missing boxes, corrupt lengths, an exhausted
/// recovery hunt) are deliberately *not* modeled here: they are logged and
/// surfaced as sentinel/absent accessor values, matching the source
/// material's print-and-continue behavior (see spec.md §7). This enum is
/// reserved for the handful of operations that can genuinely fail as a
/// `Result`.
#[derive(Error, Debug)]
pub enum Error {
    /// The worker task panicked before `stop()` could join it.
    #[error("driver task did not shut down cleanly: {0}")]
    Shutdown(String),

    /// Reserved for configuration that clamping cannot repair.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;
