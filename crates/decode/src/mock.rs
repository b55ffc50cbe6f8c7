//! Scriptable decoder for testing.

use crate::error::{ErrorKind, Result};
use crate::{Decoder, ExtractionResult, output_path};
use exn::ResultExt;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Decoder for testing schedulers without real RAW files.
///
/// Writes a tiny placeholder to the usual output path, fails for file names
/// it was told to fail, and records how many calls were in flight at once.
///
/// # Example
///
/// ```
/// use jpgx_decode::{Decoder, MockDecoder};
/// use std::time::Duration;
///
/// let decoder = MockDecoder::new().with_delay(Duration::from_millis(5)).failing(["bad.CR2"]);
/// let dest = tempfile::tempdir().unwrap();
/// assert!(decoder.extract("bad.CR2".as_ref(), dest.path(), 80).is_err());
/// assert!(decoder.extract("good.CR2".as_ref(), dest.path(), 80).is_ok());
/// assert_eq!(decoder.calls(), 2);
/// ```
#[derive(Default)]
pub struct MockDecoder {
    delay: Duration,
    orientation: f64,
    failures: HashSet<OsString>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long each call blocks, to keep calls overlapping.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Orientation reported for every successful call.
    pub fn with_orientation(mut self, radians: f64) -> Self {
        self.orientation = radians;
        self
    }

    /// File names (not full paths) that fail with [`ErrorKind::Container`].
    pub fn failing(mut self, names: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.failures.extend(names.into_iter().map(Into::into));
        self
    }

    /// Highest number of calls observed in flight simultaneously.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn run(&self, path: &Path, dest_dir: &Path) -> Result<ExtractionResult> {
        std::thread::sleep(self.delay);
        if path.file_name().is_some_and(|name| self.failures.contains(name)) {
            exn::bail!(ErrorKind::Container);
        }
        let jpeg_path = output_path(path, dest_dir);
        std::fs::write(&jpeg_path, b"\xFF\xD8mock\xFF\xD9").or_raise(|| ErrorKind::Io)?;
        Ok(ExtractionResult { jpeg_path, orientation: self.orientation })
    }
}

impl Decoder for MockDecoder {
    fn extract(&self, path: &Path, dest_dir: &Path, _quality: u8) -> Result<ExtractionResult> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.run(path, dest_dir);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        result
    }
}
