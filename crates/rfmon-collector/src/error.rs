/// Errors that abort the dispatch of one cycle's stats.
///
/// # Examples
///
/// ```rust
/// use rfmon_collector::error::DispatchError;
///
/// let err = DispatchError::NoStats;
/// assert_eq!(err.to_string(), "no stats retrieved");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The fetched map carries no values at all.
    #[error("no stats retrieved")]
    NoStats,

    /// A value violates the numeric-leaf contract. Metrics dispatched before
    /// the violation are kept.
    #[error("malformed stat at {path}: {reason}")]
    Shape { path: String, reason: String },
}

/// A single metric could not be handed to the sink.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected metric: {0}")]
    Rejected(String),
}
