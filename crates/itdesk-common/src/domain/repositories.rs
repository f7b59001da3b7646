//! Repositories - Persistence abstraction shared by all bounded contexts
//!
//! Concrete repository traits live next to their aggregates; this module only
//! carries the error vocabulary they share.

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// No row with that key
    #[error("not found: {0}")]
    NotFound(String),

    /// Write lost a compare-and-set race or violated uniqueness
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),
}
