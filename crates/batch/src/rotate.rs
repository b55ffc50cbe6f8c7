//! Post-decode rotation through an external executable.
//!
//! Rotations run in the background while decoding continues, but they are
//! not fire-and-forget: every request goes through a [`RotationDispatcher`]
//! to a single tracker task that owns the running processes. Once the last
//! dispatcher handle is dropped the tracker waits, up to a deadline, for what
//! is still running and reports a [`RotationSummary`]. Processes still running
//! at the deadline are killed.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jpgx_decode::ExtractionResult;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// One in-place rotation of an extracted JPEG.
#[derive(Clone, Debug, PartialEq)]
pub struct RotationRequest {
    pub path: PathBuf,
    /// Clockwise.
    pub degrees: f64,
}

impl RotationRequest {
    /// Builds a request from a decode result, or `None` if no rotation is needed.
    #[must_use]
    pub fn from_extraction(result: &ExtractionResult) -> Option<Self> {
        result.needs_rotation().then(|| Self {
            path: result.jpeg_path.clone(),
            degrees: result.orientation.to_degrees(),
        })
    }

    /// Degrees as passed on the command line: two decimal places.
    #[must_use]
    pub fn degrees_arg(&self) -> String {
        format!("{:.2}", self.degrees)
    }
}

/// The rotation executable (ImageMagick's `convert` by default).
#[derive(Clone, Debug)]
pub struct Rotator {
    bin: PathBuf,
    timeout: Duration,
}

impl Rotator {
    /// Looks up `name` in `PATH`.
    pub fn discover(name: &str, timeout: Duration) -> Result<Self> {
        let bin = which::which(name).or_raise(|| ErrorKind::RotatorNotFound(name.to_string()))?;
        tracing::debug!(bin = %bin.display(), "Rotation executable discovered");
        Ok(Self::new(bin, timeout))
    }

    #[must_use]
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { bin: bin.into(), timeout }
    }

    #[must_use]
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// `<bin> -rotate <degrees> <path> <path>`: input and output are the same file.
    fn command(&self, request: &RotationRequest) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-rotate")
            .arg(request.degrees_arg())
            .arg(&request.path)
            .arg(&request.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Runs one rotation to completion, killing it if it exceeds the timeout.
    pub async fn rotate(&self, request: &RotationRequest) -> Result<()> {
        tracing::info!(jpeg = %request.path.display(), degrees = %request.degrees_arg(), "Rotating image");
        let mut child = self.command(request).spawn().or_raise(|| ErrorKind::RotationLaunch)?;
        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.or_raise(|| ErrorKind::RotationLaunch)?,
            Err(_) => {
                // Killing can only fail if the process already exited.
                _ = child.kill().await;
                exn::bail!(ErrorKind::RotationTimeout);
            },
        };
        if !status.success() {
            exn::bail!(ErrorKind::RotationFailed(status.code()));
        }
        Ok(())
    }
}

/// Counts reported by the rotation tracker once all rotations are done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RotationSummary {
    pub rotated: usize,
    pub failed: usize,
    /// Still queued or running when the drain deadline passed.
    pub abandoned: usize,
}

/// Cheap, cloneable handle that decode tasks use to request rotations.
#[derive(Clone)]
pub struct RotationDispatcher {
    tx: mpsc::UnboundedSender<RotationRequest>,
}

/// The owning side of the dispatcher: await [`RotationTracker::wait`] after
/// every [`RotationDispatcher`] clone has been dropped.
pub struct RotationTracker {
    worker: JoinHandle<RotationSummary>,
}

impl RotationDispatcher {
    /// Starts the tracker task.
    ///
    /// At most `limit` rotation processes run at once; further requests queue.
    /// After the last dispatcher is dropped, outstanding rotations get
    /// `drain_timeout` to finish.
    pub fn spawn(rotator: Rotator, limit: usize, drain_timeout: Duration) -> (Self, RotationTracker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(track(rotator, rx, limit.max(1), drain_timeout));
        (Self { tx }, RotationTracker { worker })
    }

    pub fn dispatch(&self, request: RotationRequest) {
        if let Err(e) = self.tx.send(request) {
            tracing::error!(jpeg = %e.0.path.display(), "Rotation tracker has stopped; rotation skipped");
        }
    }
}

impl RotationTracker {
    pub async fn wait(self) -> RotationSummary {
        match self.worker.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "Rotation tracker failed");
                RotationSummary::default()
            },
        }
    }
}

type Running = JoinSet<(PathBuf, Result<()>)>;

fn start(rotator: &Rotator, running: &mut Running, pending: &mut VecDeque<RotationRequest>, limit: usize) {
    while running.len() < limit
        && let Some(request) = pending.pop_front()
    {
        let rotator = rotator.clone();
        running.spawn(async move {
            let result = rotator.rotate(&request).await;
            (request.path, result)
        });
    }
}

fn record(summary: &mut RotationSummary, joined: std::result::Result<(PathBuf, Result<()>), tokio::task::JoinError>) {
    match joined {
        Ok((_, Ok(()))) => summary.rotated += 1,
        Ok((path, Err(e))) => {
            tracing::warn!(jpeg = %path.display(), error = ?e, "Rotation finished with error");
            summary.failed += 1;
        },
        Err(e) => {
            tracing::error!(error = %e, "Rotation task panicked");
            summary.failed += 1;
        },
    }
}

async fn track(
    rotator: Rotator,
    mut rx: mpsc::UnboundedReceiver<RotationRequest>,
    limit: usize,
    drain_timeout: Duration,
) -> RotationSummary {
    let mut summary = RotationSummary::default();
    let mut pending = VecDeque::new();
    let mut running = JoinSet::new();
    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(request) => {
                    pending.push_back(request);
                    start(&rotator, &mut running, &mut pending, limit);
                },
                // Every dispatcher is gone: no more requests can arrive.
                None => break,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => {
                record(&mut summary, joined);
                start(&rotator, &mut running, &mut pending, limit);
            },
        }
    }

    let deadline = Instant::now() + drain_timeout;
    while !running.is_empty() {
        match tokio::time::timeout_at(deadline, running.join_next()).await {
            Ok(Some(joined)) => {
                record(&mut summary, joined);
                start(&rotator, &mut running, &mut pending, limit);
            },
            Ok(None) => break,
            Err(_) => {
                summary.abandoned = running.len() + pending.len();
                tracing::warn!(abandoned = summary.abandoned, "Rotations still outstanding at deadline; killing");
                // Aborting drops each task's child process, which kills it.
                running.shutdown().await;
                break;
            },
        }
    }
    summary
}
