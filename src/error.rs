use thiserror::Error;

/// Errors raised while constructing or rendering a criteria query.
///
/// All of these represent programmer or input errors in query construction:
/// none are transient, none are retried, and a query either renders fully or
/// fails with one of these before any text is returned.
#[derive(Debug, Error)]
pub enum CriteriaError {
    /// Malformed expression text, reported at the `select`/`where_`/... call
    /// site together with the byte position of the offending token.
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    /// A fluent sub-builder was used out of order: a sibling was started
    /// before the previous one ended, a terminal method was called while a
    /// child builder was still open, or an already-ended builder was reused.
    #[error("builder chaining error: {0}")]
    Chaining(String),

    /// A path references an attribute or join that cannot be resolved against
    /// the schema. Resolution is lazy, so this surfaces at first render.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// An incompatible combination of DISTINCT / projection / order-by with a
    /// pagination request, or a structural change to a paginated query.
    #[error("pagination state error: {0}")]
    PaginationState(String),
}

impl CriteriaError {
    #[inline]
    pub(crate) fn chaining(message: impl Into<String>) -> Self {
        Self::Chaining(message.into())
    }

    #[inline]
    pub(crate) fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    #[inline]
    pub(crate) fn pagination(message: impl Into<String>) -> Self {
        Self::PaginationState(message.into())
    }
}

/// Result type for query construction and rendering.
pub type Result<T> = std::result::Result<T, CriteriaError>;
