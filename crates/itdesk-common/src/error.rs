//! Error types shared across ITDesk crates

use thiserror::Error;

/// Errors raised while building domain primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Identifier could not be parsed
    #[error("invalid {kind} id: {value}")]
    InvalidId {
        /// Identifier kind (company, user, ...)
        kind: &'static str,
        /// Rejected input
        value: String,
    },

    /// Enumerated value not recognised
    #[error("unknown {kind}: {value}")]
    UnknownVariant {
        /// Enumeration name
        kind: &'static str,
        /// Rejected input
        value: String,
    },
}

/// Result type for domain primitive construction
pub type DomainResult<T> = Result<T, DomainError>;
