//! The decoder boundary.
//!
//! A [`Decoder`] turns one RAW file into one JPEG in a destination directory
//! and reports where it went and how it should be rotated. Implementations
//! must be safe to call from many threads at once with no shared mutable
//! state between calls. Which implementation runs is chosen at startup from
//! configuration via [`Backend`].

mod embedded;
pub mod error;
#[cfg(feature = "mock")]
mod mock;

pub use crate::embedded::EmbeddedDecoder;
use crate::error::{Error, ErrorKind, Result};
#[cfg(feature = "mock")]
pub use crate::mock::MockDecoder;
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Appended to the source file stem to name the output.
pub const OUTPUT_SUFFIX: &str = "_extracted";
pub const OUTPUT_EXTENSION: &str = "jpg";

pub type DecoderHandle = Arc<dyn Decoder + Send + Sync>;

/// What a successful decode produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
    /// Where the JPEG was written.
    pub jpeg_path: PathBuf,
    /// Clockwise rotation in radians needed to display the JPEG upright;
    /// zero means no rotation is needed.
    pub orientation: f64,
}

impl ExtractionResult {
    #[must_use]
    pub fn needs_rotation(&self) -> bool {
        self.orientation != 0.0
    }
}

pub trait Decoder: Send + Sync {
    /// Decodes `path` into `dest_dir`, encoding at `quality` (0-100) where the
    /// backend re-encodes. Blocking; callers on an async runtime should move
    /// this off the reactor.
    fn extract(&self, path: &Path, dest_dir: &Path, quality: u8) -> Result<ExtractionResult>;
}

/// The output location for a source file: `<dest>/<stem>_extracted.jpg`.
///
/// Depends only on the source file name, so re-running against the same
/// inputs overwrites the same outputs.
#[must_use]
pub fn output_path(source: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> PathBuf {
    let stem = source.as_ref().file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    dest_dir.as_ref().join(format!("{stem}{OUTPUT_SUFFIX}.{OUTPUT_EXTENSION}"))
}

/// Selectable decoder implementations.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Decode the embedded preview and re-encode it at the requested quality.
    #[default]
    #[display("reencode")]
    Reencode,
    /// Copy the embedded preview verbatim; quality is ignored.
    #[display("embedded")]
    Embedded,
}

impl Backend {
    #[must_use]
    pub fn decoder(self) -> DecoderHandle {
        Arc::new(EmbeddedDecoder::new(self))
    }
}

impl FromStr for Backend {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reencode" => Ok(Self::Reencode),
            "embedded" => Ok(Self::Embedded),
            _ => exn::bail!(ErrorKind::UnknownBackend(s.to_string())),
        }
    }
}

/// Parsed like [`FromStr`], so configuration files and environment
/// variables accept the same spellings as the command line.
impl<'de> Deserialize<'de> for Backend {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Self>().map_err(|_| serde::de::Error::unknown_variant(&name, &["reencode", "embedded"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/photos/DSC_0001.NEF", "/out", "/out/DSC_0001_extracted.jpg")]
    #[case("/photos/a.CR2", "/out/", "/out/a_extracted.jpg")]
    #[case("relative/b.c.cr2", "/out", "/out/b.c_extracted.jpg")]
    fn test_output_path(#[case] source: &str, #[case] dest: &str, #[case] expected: &str) {
        assert_eq!(output_path(source, dest), PathBuf::from(expected));
    }

    #[test]
    fn output_path_is_stable() {
        assert_eq!(output_path("/a/x.NEF", "/out"), output_path("/b/x.NEF", "/out"));
    }

    #[rstest]
    #[case("reencode", Backend::Reencode)]
    #[case("Embedded", Backend::Embedded)]
    fn test_backend_from_str(#[case] input: &str, #[case] expected: Backend) {
        assert_eq!(input.parse::<Backend>().unwrap(), expected);
        assert_eq!(expected.to_string(), input.to_lowercase());
    }

    #[test]
    fn backend_serde() {
        assert_eq!(serde_json::from_str::<Backend>("\"embedded\"").unwrap(), Backend::Embedded);
        assert_eq!(serde_json::from_str::<Backend>("\"Embedded\"").unwrap(), Backend::Embedded);
        assert_eq!(serde_json::from_str::<Backend>("\" REENCODE \"").unwrap(), Backend::Reencode);
        assert!(serde_json::from_str::<Backend>("\"libraw\"").is_err());
        assert_eq!(serde_json::to_string(&Backend::Reencode).unwrap(), "\"reencode\"");
        assert!("libraw".parse::<Backend>().is_err());
    }

    #[test]
    fn needs_rotation() {
        let result = ExtractionResult { jpeg_path: PathBuf::from("/out/a_extracted.jpg"), orientation: 0.0 };
        assert!(!result.needs_rotation());
        let result = ExtractionResult { orientation: std::f64::consts::PI, ..result };
        assert!(result.needs_rotation());
    }
}
