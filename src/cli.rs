use clap::Parser;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use serde::Serialize;
use std::path::PathBuf;

/// Extract the embedded JPEG from every camera RAW file in a set of directories.
///
/// Every flag can also be set in a config file or through `JPGX_*`
/// environment variables; flags given here win.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "jpgx", author, version, about)]
pub struct Args {
    /// Comma-separated RAW extensions to process (NEF, CR2).
    #[arg(long, value_name = "EXTS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raws: Option<String>,

    /// Comma-separated source directories (not searched recursively).
    #[arg(long, value_name = "DIRS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_dirs: Option<String>,

    /// Directory extracted JPEGs are written to.
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,

    /// Maximum number of files decoded at the same time [default: 2].
    #[arg(long, value_name = "N")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_routines: Option<usize>,

    /// JPEG quality, 0-100 [default: 80].
    #[arg(long, value_name = "Q", value_parser = clap::value_parser!(u8).range(0..=100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,

    /// Rotate extracted JPEGs upright according to the RAW orientation.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rotate: bool,

    /// Rotation executable, looked up in PATH [default: convert].
    #[arg(long, value_name = "BIN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate_bin: Option<String>,

    /// Seconds a rotation may run, and how long to wait for outstanding
    /// rotations at the end of the run [default: 300].
    #[arg(long, value_name = "SECS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate_timeout: Option<u64>,

    /// How JPEGs are produced [default: reencode].
    #[arg(
        long,
        ignore_case = true,
        value_parser = PossibleValuesParser::new(["reencode", "embedded"]).map(|s| s.to_lowercase()),
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Configuration file (TOML, YAML or JSON, by extension).
    #[arg(long, value_name = "PATH")]
    #[serde(skip)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind as ClapErrorKind;
    use figment::Figment;
    use figment::providers::Serialized;
    use jpgx_config::Config;
    use jpgx_decode::Backend;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("jpgx").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn only_given_flags_override() {
        let args = parse(&["--raws", "NEF,CR2", "--quality", "95", "--config", "/etc/jpgx.toml"]);
        let config: Config = Figment::from(Serialized::defaults(Config {
            num_routines: 6,
            ..Config::default()
        }))
        .merge(Serialized::defaults(&args))
        .extract()
        .unwrap();
        assert_eq!(config.raws, vec!["NEF", "CR2"]);
        assert_eq!(config.quality, 95);
        assert_eq!(config.num_routines, 6);
        assert!(!config.rotate);
    }

    #[test]
    fn all_flags() {
        let args = parse(&[
            "--raws=CR2",
            "--src-dirs=/a,/b",
            "--dest-dir=/out",
            "--num-routines=4",
            "--rotate",
            "--rotate-bin=magick",
            "--rotate-timeout=30",
            "--backend=Embedded",
        ]);
        let config: Config = Figment::from(Serialized::defaults(&args)).extract().unwrap();
        assert_eq!(config.src_dirs, vec!["/a", "/b"]);
        assert_eq!(config.dest_dir, Some(PathBuf::from("/out")));
        assert_eq!(config.num_routines, 4);
        assert!(config.rotate);
        assert_eq!(config.rotate_bin, "magick");
        assert_eq!(config.rotate_timeout, 30);
        assert_eq!(config.backend, Backend::Embedded);
    }

    #[test]
    fn bad_values_are_usage_errors() {
        for args in [["jpgx", "--quality", "101"], ["jpgx", "--backend", "libraw"], ["jpgx", "--num-routines", "x"]] {
            let err = Args::try_parse_from(args).unwrap_err();
            assert!(err.use_stderr(), "{args:?}");
        }
        let help = Args::try_parse_from(["jpgx", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ClapErrorKind::DisplayHelp);
        assert!(!help.use_stderr());
    }
}
