//! Stage 2: turn each materialized segment into a uniformly formatted clip.

use super::arena::ScratchArena;
use super::error::PipelineError;
use super::materialize::MaterializedSegment;
use super::report::{cancellable, SegmentOutcome, StageReport};
use crate::domain::commands::{clip_args, EncodeSettings};
use crate::domain::segment::{SkipStage, SkippedSegment};
use crate::ports::engine::TranscodeEngine;
use crate::ports::progress::{ProgressEvent, ProgressSink};
use tokio_util::sync::CancellationToken;

/// One encoded clip, addressed by its segment's original position.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedClip {
    pub position: usize,
    pub segment_id: i64,
    pub name: String,
    pub duration: f64,
}

/// Encode segments one at a time. A failed encode drops that segment only.
pub async fn encode<E>(
    engine: &E,
    arena: &mut ScratchArena,
    segments: &[MaterializedSegment],
    settings: &EncodeSettings,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<StageReport<EncodedClip>, PipelineError>
where
    E: TranscodeEngine + ?Sized,
{
    let total = segments.len();
    let mut report = StageReport::default();

    for (index, segment) in segments.iter().enumerate() {
        progress.notify(&ProgressEvent::Encoding {
            position: index,
            total,
        });

        let name = ScratchArena::clip_name(segment.position);
        let args = clip_args(
            settings,
            &segment.image,
            &segment.audio,
            segment.duration,
            &name,
        );

        let outcome = match cancellable(cancel, arena.exec(engine, &args, &name)).await? {
            Ok(()) => SegmentOutcome::Kept(EncodedClip {
                position: segment.position,
                segment_id: segment.segment_id,
                name,
                duration: segment.duration,
            }),
            Err(e) => {
                tracing::warn!(
                    position = segment.position,
                    segment_id = segment.segment_id,
                    silent = segment.silent,
                    error = %e,
                    "segment encode failed, dropping it"
                );
                let reason = format!("transcoding failed: {}", e);
                progress.notify(&ProgressEvent::SegmentSkipped {
                    position: segment.position,
                    segment_id: segment.segment_id,
                    reason: reason.clone(),
                });
                SegmentOutcome::Skipped(SkippedSegment {
                    position: segment.position,
                    segment_id: segment.segment_id,
                    stage: SkipStage::Encode,
                    reason,
                })
            }
        };
        report.push(outcome);
    }

    if report.kept.is_empty() {
        return Err(PipelineError::NoClips(report.skipped));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::FakeEngine;

    fn materialized(position: usize) -> MaterializedSegment {
        MaterializedSegment {
            position,
            segment_id: 100 + position as i64,
            image: ScratchArena::image_name(position, "jpg"),
            audio: ScratchArena::audio_name(position, "m4a"),
            duration: 5.0,
            silent: true,
        }
    }

    async fn seeded(engine: &FakeEngine, positions: &[usize]) -> Vec<MaterializedSegment> {
        let mut out = Vec::new();
        for &p in positions {
            let seg = materialized(p);
            engine.write_file(&seg.image, format!("img-{}", p).as_bytes()).await.unwrap();
            engine.write_file(&seg.audio, b"silence").await.unwrap();
            out.push(seg);
        }
        out
    }

    fn silent_progress(_: &ProgressEvent) {}

    #[tokio::test]
    async fn test_clips_named_by_original_position() {
        let engine = FakeEngine::new();
        let segments = seeded(&engine, &[0, 2, 5]).await;
        let mut arena = ScratchArena::new();

        let report = encode(
            &engine,
            &mut arena,
            &segments,
            &EncodeSettings::default(),
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let names: Vec<_> = report.kept.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["clip_0.mp4", "clip_2.mp4", "clip_5.mp4"]);
        assert_eq!(engine.execs().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_encode_is_dropped_and_later_segments_continue() {
        let engine = FakeEngine::new();
        engine.fail_output("clip_0.mp4");
        let segments = seeded(&engine, &[0, 1]).await;
        let mut arena = ScratchArena::new();

        let report = encode(
            &engine,
            &mut arena,
            &segments,
            &EncodeSettings::default(),
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].position, 1);
        assert_eq!(report.skipped[0].stage, SkipStage::Encode);
        assert!(report.skipped[0].reason.contains("simulated encoder failure"));
    }

    #[tokio::test]
    async fn test_all_encodes_failing_is_fatal() {
        let engine = FakeEngine::new();
        engine.fail_output("clip_0.mp4");
        let segments = seeded(&engine, &[0]).await;
        let mut arena = ScratchArena::new();

        let err = encode(
            &engine,
            &mut arena,
            &segments,
            &EncodeSettings::default(),
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::NoClips(ref s) if s.len() == 1));
        assert!(err
            .to_string()
            .starts_with("no video segments were successfully created"));
    }
}
