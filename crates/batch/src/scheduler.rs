//! The bounded-concurrency scheduler.
//!
//! Files are admitted one at a time into a sliding window of at most
//! `budget` decode tasks. Each task reports back with exactly one
//! [`CompletionSignal`]; when the window is full the scheduler waits for one
//! signal and admits the next file. The signal channel is the only thing the
//! scheduler and its tasks share.

use crate::aggregate::{ResultAggregator, RunSummary};
use crate::discovery::{SourceFile, discover};
use crate::rotate::{RotationDispatcher, RotationRequest, RotationSummary, Rotator};
use jpgx_config::Settings;
use jpgx_decode::DecoderHandle;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Decoded,
    Failed,
    /// The task was torn down before it could say how it went.
    Abandoned,
}

/// "One decode task finished." Carries no result, only enough to count it.
#[derive(Debug)]
pub(crate) struct CompletionSignal {
    outcome: TaskOutcome,
}

impl CompletionSignal {
    pub(crate) fn new(outcome: TaskOutcome) -> Self {
        Self { outcome }
    }

    pub(crate) fn outcome(&self) -> TaskOutcome {
        self.outcome
    }
}

/// Sends the task's completion signal when dropped, so the signal goes out
/// exactly once however the task ends.
struct CompletionGuard {
    tx: mpsc::Sender<CompletionSignal>,
    outcome: TaskOutcome,
}

impl CompletionGuard {
    fn new(tx: mpsc::Sender<CompletionSignal>) -> Self {
        Self { tx, outcome: TaskOutcome::Abandoned }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        // Channel capacity equals the budget and a task stays counted until
        // its signal is received, so there is always room.
        if let Err(e) = self.tx.try_send(CompletionSignal::new(self.outcome)) {
            tracing::error!(error = %e, "Completion signal could not be delivered");
        }
    }
}

/// One admitted file, bound to the decoder.
struct DecodeTask {
    file: SourceFile,
    settings: Arc<Settings>,
    decoder: DecoderHandle,
    rotations: Option<RotationDispatcher>,
}

impl DecodeTask {
    async fn run(self, mut guard: CompletionGuard) {
        let Self { file, settings, decoder, rotations } = self;
        let path = file.path.clone();
        let joined =
            tokio::task::spawn_blocking(move || decoder.extract(&path, &settings.dest_dir, settings.quality)).await;
        guard.outcome = match joined {
            Ok(Ok(extracted)) => {
                tracing::debug!(path = %file.path.display(), jpeg = %extracted.jpeg_path.display(), "File extracted");
                if let Some(rotations) = &rotations
                    && let Some(request) = RotationRequest::from_extraction(&extracted)
                {
                    rotations.dispatch(request);
                }
                TaskOutcome::Decoded
            },
            Ok(Err(e)) => {
                tracing::error!(path = %file.path.display(), error = ?e, "Error processing file");
                TaskOutcome::Failed
            },
            Err(e) => {
                tracing::error!(path = %file.path.display(), error = %e, "Decoder panicked");
                TaskOutcome::Failed
            },
        };
    }
}

/// Runs every (source directory × RAW type) pass for one batch.
pub struct Scheduler {
    settings: Arc<Settings>,
    decoder: DecoderHandle,
    rotator: Option<Rotator>,
}

impl Scheduler {
    #[must_use]
    pub fn new(settings: Arc<Settings>, decoder: DecoderHandle) -> Self {
        Self { settings, decoder, rotator: None }
    }

    /// Rotation still only happens when the settings ask for it.
    #[must_use]
    pub fn with_rotator(mut self, rotator: Rotator) -> Self {
        self.rotator = Some(rotator);
        self
    }

    /// Processes every discovered file and returns once all decode tasks and
    /// all rotations have finished (or the rotation deadline has passed).
    ///
    /// Individual failures are logged and counted; they never stop the run.
    #[instrument(skip_all, fields(budget = self.budget()))]
    pub async fn run(&self) -> RunSummary {
        let budget = self.budget();
        let (rotations, tracker) = match (&self.rotator, self.settings.rotate) {
            (Some(rotator), true) => {
                let (dispatcher, tracker) =
                    RotationDispatcher::spawn(rotator.clone(), budget, self.settings.rotate_timeout);
                (Some(dispatcher), Some(tracker))
            },
            (None, true) => {
                tracing::warn!("Rotation enabled without a rotation executable; skipping rotations");
                (None, None)
            },
            _ => (None, None),
        };

        let (tx, mut rx) = mpsc::channel(budget);
        let mut aggregator = ResultAggregator::default();
        for dir in &self.settings.src_dirs {
            for raw_type in &self.settings.raw_types {
                let files = match discover(dir, *raw_type).await {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::error!(dir = %dir.display(), %raw_type, error = ?e, "Discovery failed; skipping");
                        continue;
                    },
                };
                if files.is_empty() {
                    continue;
                }
                tracing::info!(%raw_type, dir = %dir.display(), files = files.len(), "Processing files");
                aggregator.add_discovered(files.len());
                self.run_pass(files, &tx, &mut rx, rotations.as_ref(), &mut aggregator).await;
            }
        }
        // Each pass drained its own signals: no task can still hold a sender.
        drop(tx);
        drop(rotations);

        let rotation = match tracker {
            Some(tracker) => tracker.wait().await,
            None => RotationSummary::default(),
        };
        tracing::debug!(total = aggregator.total(), "All passes complete");
        aggregator.finish(rotation)
    }

    async fn run_pass(
        &self,
        files: Vec<SourceFile>,
        tx: &mpsc::Sender<CompletionSignal>,
        rx: &mut mpsc::Receiver<CompletionSignal>,
        rotations: Option<&RotationDispatcher>,
        aggregator: &mut ResultAggregator,
    ) {
        let budget = self.budget();
        let mut active = 0;
        for file in files {
            if active == budget {
                Self::await_completion(rx, aggregator).await;
                active -= 1;
            }
            let task = DecodeTask {
                file,
                settings: Arc::clone(&self.settings),
                decoder: Arc::clone(&self.decoder),
                rotations: rotations.cloned(),
            };
            tokio::spawn(task.run(CompletionGuard::new(tx.clone())));
            active += 1;
        }
        while active > 0 {
            Self::await_completion(rx, aggregator).await;
            active -= 1;
        }
    }

    /// The configured budget, capped at what a bounded channel can hold.
    fn budget(&self) -> usize {
        self.settings.budget.get().min(Semaphore::MAX_PERMITS)
    }

    async fn await_completion(rx: &mut mpsc::Receiver<CompletionSignal>, aggregator: &mut ResultAggregator) {
        // `None` would mean every sender is gone, but the scheduler keeps one
        // for the whole run.
        if let Some(signal) = rx.recv().await {
            aggregator.record(signal);
        }
    }
}
