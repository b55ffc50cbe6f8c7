//! Startup Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons the binary exits with a failure before scheduling anything.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    /// Rotation was requested but the executable is unusable.
    #[display("rotation unavailable")]
    Rotator,
    #[display("unable to start async runtime")]
    Runtime,
}
