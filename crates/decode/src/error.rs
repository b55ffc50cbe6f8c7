//! Decode Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A decode error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading the source or writing the output failed.
    #[display("I/O error")]
    Io,
    /// The source file is not a usable RAW container.
    #[display("invalid RAW container")]
    Container,
    /// The embedded JPEG could not be decoded or re-encoded.
    #[display("JPEG encoding failed")]
    Encode,
    /// Unknown backend name in configuration.
    #[display("unknown decoder backend: {_0}")]
    UnknownBackend(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::Container.is_retryable());
        assert!(!ErrorKind::Encode.is_retryable());
    }
}
