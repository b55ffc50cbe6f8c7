use crate::rotate::RotationSummary;
use crate::scheduler::{CompletionSignal, TaskOutcome};

/// What a run did. `total` is the batch total: every discovered file,
/// whether or not it decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub decoded: usize,
    pub failed: usize,
    pub rotation: RotationSummary,
}

/// Accumulates per-pass counts. Lives on the orchestrating task only.
#[derive(Debug, Default)]
pub(crate) struct ResultAggregator {
    summary: RunSummary,
}

impl ResultAggregator {
    pub(crate) fn add_discovered(&mut self, count: usize) {
        self.summary.total += count;
    }

    pub(crate) fn record(&mut self, signal: CompletionSignal) {
        match signal.outcome() {
            TaskOutcome::Decoded => self.summary.decoded += 1,
            TaskOutcome::Failed | TaskOutcome::Abandoned => self.summary.failed += 1,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.summary.total
    }

    pub(crate) fn finish(self, rotation: RotationSummary) -> RunSummary {
        RunSummary { rotation, ..self.summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_count_discovered_files_not_successes() {
        let mut aggregator = ResultAggregator::default();
        aggregator.add_discovered(3);
        aggregator.add_discovered(0);
        aggregator.add_discovered(2);
        aggregator.record(CompletionSignal::new(TaskOutcome::Decoded));
        aggregator.record(CompletionSignal::new(TaskOutcome::Failed));
        aggregator.record(CompletionSignal::new(TaskOutcome::Abandoned));
        let rotation = RotationSummary { rotated: 1, ..Default::default() };
        let summary = aggregator.finish(rotation);
        assert_eq!(summary, RunSummary { total: 5, decoded: 1, failed: 2, rotation });
    }
}
