use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jpgx_raw::RawType;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A RAW file found during discovery. Each one is admitted exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub raw_type: RawType,
}

/// Lists the files of one RAW type directly inside `dir` (no recursion).
///
/// Extensions match case-insensitively, symlinks are followed, and the
/// result is sorted by path so discovery order is stable between runs.
pub async fn discover(dir: &Path, raw_type: RawType) -> Result<Vec<SourceFile>> {
    let mut entries = fs::read_dir(dir).await.or_raise(|| ErrorKind::Discovery(dir.to_path_buf()))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Discovery(dir.to_path_buf()))? {
        let path = entry.path();
        if !raw_type.matches(&path) {
            continue;
        }
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push(SourceFile { path, raw_type }),
            Ok(_) => {},
            // Most likely a broken symlink.
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
