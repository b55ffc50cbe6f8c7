//! RAW Parsing Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A RAW parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for RAW parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file does not start with a TIFF header; it is not a supported RAW file.
    #[display("not a TIFF-based RAW file")]
    NotTiff,
    /// An offset or length inside the container points past the end of the file.
    #[display("truncated or corrupted RAW container")]
    Truncated,
    /// The container parsed fine but holds no displayable JPEG preview.
    #[display("no embedded JPEG found")]
    NoEmbeddedJpeg,
    /// The extension is not one of the supported RAW types.
    #[display("unsupported RAW type: {_0}")]
    UnsupportedRawType(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes are either a valid container or they aren't.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NoEmbeddedJpeg.to_string(), "no embedded JPEG found");
        assert_eq!(ErrorKind::UnsupportedRawType("XYZ".to_string()).to_string(), "unsupported RAW type: XYZ");
    }
}
