//! Batch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A batch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source directory could not be listed.
    #[display("unable to list directory: {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    /// The rotation executable is not in `PATH`.
    #[display("rotation executable not found in PATH: {_0}")]
    RotatorNotFound(#[error(not(source))] String),
    /// The rotation executable could not be started.
    #[display("unable to launch rotation executable")]
    RotationLaunch,
    /// The rotation executable exited unsuccessfully. No exit code means it
    /// was killed by a signal.
    #[display("rotation exited with code: {_0:?}")]
    RotationFailed(#[error(not(source))] Option<i32>),
    /// The rotation executable ran past its timeout and was killed.
    #[display("rotation timed out")]
    RotationTimeout,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RotationTimeout | Self::RotationLaunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::RotatorNotFound("convert".to_string()).to_string(),
            "rotation executable not found in PATH: convert"
        );
        assert_eq!(ErrorKind::RotationFailed(Some(1)).to_string(), "rotation exited with code: Some(1)");
    }
}
