use thiserror::Error;

/// Error taxonomy surfaced by every engine operation.
///
/// State-machine violations and not-found conditions always propagate to the
/// caller; the caller owns user-facing messaging. "No eligible candidates" is
/// deliberately absent: an unmatched request is a valid outcome, surfaced as
/// a notification rather than an error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound(kind, id.to_string())
    }
}
