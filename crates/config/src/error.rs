//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that stops a run before any file is scheduled.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or had the wrong shape.
    #[display("could not load configuration")]
    Load,
    /// A required setting was given by no source.
    #[display("missing required setting: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    #[display("unsupported RAW type: {_0}")]
    UnsupportedRawType(#[error(not(source))] String),
    /// Directory does not exist or cannot be opened.
    #[display("unable to open directory: {}", _0.display())]
    InvalidDirectory(#[error(not(source))] PathBuf),
    #[display("not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    #[display("JPEG quality must be between 0 and 100, got {_0}")]
    InvalidQuality(#[error(not(source))] u8),
    #[display("number of concurrent routines must be between 1 and {}", crate::MAX_NUM_ROUTINES)]
    InvalidConcurrency,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Every variant needs the user to change their input first.
        false
    }
}
