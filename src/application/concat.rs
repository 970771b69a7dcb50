//! Stage 3: stream-copy the encoded clips into one deliverable file.

use super::arena::{ScratchArena, MANIFEST_NAME, OUTPUT_NAME};
use super::encode::EncodedClip;
use super::error::PipelineError;
use super::report::cancellable;
use crate::domain::commands::{concat_args, ConcatManifest};
use crate::ports::engine::TranscodeEngine;
use crate::ports::progress::{ProgressEvent, ProgressSink};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// Concatenate `clips` in the given order. There is no degraded result: any
/// failure here fails the whole invocation.
pub async fn concatenate<E>(
    engine: &E,
    arena: &mut ScratchArena,
    clips: &[EncodedClip],
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<Bytes, PipelineError>
where
    E: TranscodeEngine + ?Sized,
{
    progress.notify(&ProgressEvent::Concatenating { clips: clips.len() });

    let manifest: ConcatManifest = clips.iter().map(|clip| clip.name.as_str()).collect();
    if manifest.is_empty() {
        return Err(PipelineError::Concatenation(String::from("no clips to join")));
    }

    cancellable(
        cancel,
        arena.write(engine, MANIFEST_NAME, manifest.render().as_bytes()),
    )
    .await?
    .map_err(|e| PipelineError::Concatenation(format!("could not write manifest: {}", e)))?;

    let args = concat_args(MANIFEST_NAME, OUTPUT_NAME);
    cancellable(cancel, arena.exec(engine, &args, OUTPUT_NAME))
        .await?
        .map_err(|e| PipelineError::Concatenation(e.to_string()))?;

    progress.notify(&ProgressEvent::Finalizing);

    let bytes = cancellable(cancel, engine.read_file(OUTPUT_NAME))
        .await?
        .map_err(|e| PipelineError::Concatenation(format!("could not read output: {}", e)))?;
    if bytes.is_empty() {
        return Err(PipelineError::Concatenation(String::from(
            "output file is empty",
        )));
    }

    let seconds: f64 = clips.iter().map(|clip| clip.duration).sum();
    tracing::info!(
        clips = clips.len(),
        seconds,
        bytes = bytes.len(),
        "video concatenated"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::FakeEngine;

    fn clip(position: usize) -> EncodedClip {
        EncodedClip {
            position,
            segment_id: position as i64,
            name: ScratchArena::clip_name(position),
            duration: 5.0,
        }
    }

    fn silent_progress(_: &ProgressEvent) {}

    #[tokio::test]
    async fn test_manifest_lists_clips_in_order() {
        let engine = FakeEngine::new();
        engine.write_file("clip_0.mp4", b"A").await.unwrap();
        engine.write_file("clip_2.mp4", b"C").await.unwrap();
        let mut arena = ScratchArena::new();

        let bytes = concatenate(
            &engine,
            &mut arena,
            &[clip(0), clip(2)],
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(&bytes[..], b"A|C");
        let manifest = engine.read_file(MANIFEST_NAME).await.unwrap();
        assert_eq!(&manifest[..], b"file 'clip_0.mp4'\nfile 'clip_2.mp4'\n");
        let concat = engine.execs().pop().unwrap();
        assert!(concat.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
    }

    #[tokio::test]
    async fn test_concat_failure_surfaces_engine_text() {
        let engine = FakeEngine::new();
        engine.write_file("clip_0.mp4", b"A").await.unwrap();
        engine.fail_output(OUTPUT_NAME);
        let mut arena = ScratchArena::new();

        let err = concatenate(
            &engine,
            &mut arena,
            &[clip(0)],
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Concatenation(_)));
        assert!(err.to_string().contains("simulated encoder failure"));
    }

    #[tokio::test]
    async fn test_missing_clip_file_fails_concatenation() {
        let engine = FakeEngine::new();
        let mut arena = ScratchArena::new();

        let err = concatenate(
            &engine,
            &mut arena,
            &[clip(3)],
            &silent_progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("clip_3.mp4"));
    }
}
