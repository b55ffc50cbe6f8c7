use crate::{Config, MAX_NUM_ROUTINES};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jpgx_decode::Backend;
use jpgx_raw::RawType;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Validated, immutable run parameters.
///
/// Built once by [`Config::validate`] before any work is scheduled and only
/// ever read afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// De-duplicated, in the order given.
    pub raw_types: Vec<RawType>,
    /// Canonical (absolute) paths, de-duplicated, in the order given.
    pub src_dirs: Vec<PathBuf>,
    pub dest_dir: PathBuf,
    /// Concurrency budget: decode tasks allowed in flight at once.
    pub budget: NonZeroUsize,
    pub quality: u8,
    pub rotate: bool,
    pub rotate_bin: String,
    pub rotate_timeout: Duration,
    pub backend: Backend,
}

impl Config {
    /// Checks every setting and resolves directories.
    ///
    /// Checks run in a fixed order and stop at the first failure: required
    /// settings, RAW types, source directories, destination directory,
    /// quality, concurrency.
    pub fn validate(&self) -> Result<Settings> {
        if self.raws.is_empty() {
            exn::bail!(ErrorKind::MissingField("raws"));
        }
        if self.src_dirs.is_empty() {
            exn::bail!(ErrorKind::MissingField("src_dirs"));
        }
        let Some(dest_dir) = self.dest_dir.as_deref().filter(|p| !p.as_os_str().is_empty()) else {
            exn::bail!(ErrorKind::MissingField("dest_dir"));
        };

        let mut raw_types = Vec::with_capacity(self.raws.len());
        for ext in &self.raws {
            let kind = ext.parse::<RawType>().or_raise(|| ErrorKind::UnsupportedRawType(ext.trim().to_uppercase()))?;
            if !raw_types.contains(&kind) {
                raw_types.push(kind);
            }
        }

        let mut src_dirs = Vec::with_capacity(self.src_dirs.len());
        for dir in &self.src_dirs {
            let dir = directory(Path::new(dir))?;
            if !src_dirs.contains(&dir) {
                src_dirs.push(dir);
            }
        }
        let dest_dir = directory(dest_dir)?;

        if self.quality > 100 {
            exn::bail!(ErrorKind::InvalidQuality(self.quality));
        }
        let budget = NonZeroUsize::new(self.num_routines)
            .filter(|n| n.get() <= MAX_NUM_ROUTINES)
            .ok_or(ErrorKind::InvalidConcurrency)?;

        Ok(Settings {
            raw_types,
            src_dirs,
            dest_dir,
            budget,
            quality: self.quality,
            rotate: self.rotate,
            rotate_bin: self.rotate_bin.clone(),
            rotate_timeout: Duration::from_secs(self.rotate_timeout),
            backend: self.backend,
        })
    }
}

fn directory(path: &Path) -> Result<PathBuf> {
    let canonical = std::fs::canonicalize(path).or_raise(|| ErrorKind::InvalidDirectory(path.to_path_buf()))?;
    if !canonical.is_dir() {
        exn::bail!(ErrorKind::NotADirectory(path.to_path_buf()));
    }
    Ok(canonical)
}
