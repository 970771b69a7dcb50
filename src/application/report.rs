use super::error::PipelineError;
use crate::domain::segment::SkippedSegment;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// What happened to one segment in one stage.
#[derive(Debug)]
pub enum SegmentOutcome<T> {
    Kept(T),
    Skipped(SkippedSegment),
}

/// Per-stage fold of segment outcomes, in input order.
#[derive(Debug)]
pub struct StageReport<T> {
    pub kept: Vec<T>,
    pub skipped: Vec<SkippedSegment>,
}

impl<T> Default for StageReport<T> {
    fn default() -> Self {
        Self {
            kept: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> StageReport<T> {
    pub fn push(&mut self, outcome: SegmentOutcome<T>) {
        match outcome {
            SegmentOutcome::Kept(value) => self.kept.push(value),
            SegmentOutcome::Skipped(skipped) => self.skipped.push(skipped),
        }
    }
}

impl<T> FromIterator<SegmentOutcome<T>> for StageReport<T> {
    fn from_iter<I: IntoIterator<Item = SegmentOutcome<T>>>(iter: I) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}

/// Race `fut` against cancellation; cancellation wins ties.
pub(crate) async fn cancellable<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, PipelineError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::SkipStage;

    fn skipped(position: usize) -> SkippedSegment {
        SkippedSegment {
            position,
            segment_id: position as i64,
            stage: SkipStage::Materialize,
            reason: "gone".into(),
        }
    }

    #[test]
    fn test_fold_keeps_order() {
        let report: StageReport<usize> = vec![
            SegmentOutcome::Kept(0),
            SegmentOutcome::Skipped(skipped(1)),
            SegmentOutcome::Kept(2),
        ]
        .into_iter()
        .collect();
        assert_eq!(report.kept, vec![0, 2]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].position, 1);
    }

    #[tokio::test]
    async fn test_cancellable_wins_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { 42 }).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_through() {
        let token = CancellationToken::new();
        assert_eq!(cancellable(&token, async { 42 }).await.unwrap(), 42);
    }
}
