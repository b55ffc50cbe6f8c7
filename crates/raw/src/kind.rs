use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::path::Path;
use std::str::FromStr;

/// A supported camera RAW format, identified by file extension.
///
/// The canonical (displayed) form of each extension is uppercase, but paths
/// and user input are matched case-insensitively.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawType {
    /// Nikon Electronic Format (.NEF)
    #[display("NEF")]
    Nef,
    /// Canon RAW version 2 (.CR2)
    #[display("CR2")]
    Cr2,
}

impl RawType {
    pub const ALL: [RawType; 2] = [RawType::Nef, RawType::Cr2];

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Nef => "NEF",
            Self::Cr2 => "CR2",
        }
    }

    /// Does the path carry this type's extension?
    #[must_use]
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension()))
    }
}

impl FromStr for RawType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NEF" => Ok(Self::Nef),
            "CR2" => Ok(Self::Cr2),
            _ => exn::bail!(ErrorKind::UnsupportedRawType(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NEF", RawType::Nef)]
    #[case("nef", RawType::Nef)]
    #[case(" CR2 ", RawType::Cr2)]
    #[case("cr2", RawType::Cr2)]
    fn test_from_str(#[case] input: &str, #[case] expected: RawType) {
        assert_eq!(input.parse::<RawType>().unwrap(), expected);
    }

    #[rstest]
    #[case("XYZ")]
    #[case("")]
    #[case("DNG")]
    fn test_from_str_unsupported(#[case] input: &str) {
        let err = input.parse::<RawType>().unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedRawType(input.to_string()));
    }

    #[rstest]
    #[case("/photos/a.CR2", RawType::Cr2, true)]
    #[case("/photos/a.cr2", RawType::Cr2, true)]
    #[case("relative/DSC_0001.NEF", RawType::Nef, true)]
    #[case("relative/DSC_0001.NEF", RawType::Cr2, false)]
    #[case("/photos/a.jpg", RawType::Nef, false)]
    #[case("/photos/NEF", RawType::Nef, false)]
    fn test_matches(#[case] path: &str, #[case] kind: RawType, #[case] expected: bool) {
        assert_eq!(kind.matches(path), expected);
    }

    #[test]
    fn test_display_is_canonical_extension() {
        for kind in RawType::ALL {
            assert_eq!(kind.to_string(), kind.extension());
        }
    }
}
