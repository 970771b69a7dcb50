use crate::domain::commands::InvalidSettings;
use crate::domain::segment::SkippedSegment;
use std::time::Duration;

/// Terminal failure of one pipeline invocation.
///
/// Messages are meant to be shown to the end user as-is; underlying error
/// text is appended rather than discarded.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no valid segments; all image downloads failed{}", summarize(.0))]
    NoValidSegments(Vec<SkippedSegment>),

    #[error("no video segments were successfully created{}", summarize(.0))]
    NoClips(Vec<SkippedSegment>),

    #[error("failed to concatenate video segments: {0}")]
    Concatenation(String),

    #[error("video generation was cancelled")]
    Cancelled,

    #[error("video generation timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    InvalidSettings(#[from] InvalidSettings),
}

fn summarize(skipped: &[SkippedSegment]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let reasons: Vec<String> = skipped
        .iter()
        .map(|s| format!("segment {}: {}", s.position + 1, s.reason))
        .collect();
    format!(" ({})", reasons.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::SkipStage;

    #[test]
    fn test_messages_keep_underlying_reasons() {
        let err = PipelineError::NoValidSegments(vec![SkippedSegment {
            position: 0,
            segment_id: 11,
            stage: SkipStage::Materialize,
            reason: "image download failed: server responded with HTTP 404".into(),
        }]);
        assert_eq!(
            err.to_string(),
            "no valid segments; all image downloads failed \
             (segment 1: image download failed: server responded with HTTP 404)"
        );
    }

    #[test]
    fn test_messages_without_details() {
        assert_eq!(
            PipelineError::NoClips(Vec::new()).to_string(),
            "no video segments were successfully created"
        );
        assert!(PipelineError::Concatenation("moov atom not found".into())
            .to_string()
            .contains("moov atom not found"));
    }
}
