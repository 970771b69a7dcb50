//! Stage 1: bring every segment's image and audio into engine storage.

use super::arena::ScratchArena;
use super::error::PipelineError;
use super::report::{cancellable, SegmentOutcome, StageReport};
use crate::domain::commands::silence_args;
use crate::domain::media::{audio_extension, image_extension};
use crate::domain::segment::{Segment, SkipStage, SkippedSegment};
use crate::ports::engine::TranscodeEngine;
use crate::ports::fetcher::{AssetFetcher, FetchError, FetchOptions};
use crate::ports::progress::{ProgressEvent, ProgressSink};
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// A segment whose image and audio both exist in engine storage.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedSegment {
    /// Position in the original input
    pub position: usize,
    pub segment_id: i64,
    pub image: String,
    pub audio: String,
    pub duration: f64,
    /// Audio is generated silence rather than narration
    pub silent: bool,
}

#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub fetch: FetchOptions,
    pub default_duration: f64,
    /// Segments whose downloads may be in flight at once
    pub concurrency: usize,
}

struct FetchedAssets {
    image: Result<Bytes, FetchError>,
    audio: Option<Result<Bytes, FetchError>>,
}

async fn fetch_assets<F>(fetcher: &F, segment: &Segment, options: &FetchOptions) -> FetchedAssets
where
    F: AssetFetcher + ?Sized,
{
    let image = fetcher.fetch(&segment.image_url, options).await;
    // Without an image the segment is dropped anyway.
    let audio = match (&image, segment.narration_url()) {
        (Ok(_), Some(url)) => Some(fetcher.fetch(url, options).await),
        _ => None,
    };
    FetchedAssets { image, audio }
}

/// Materialize `segments` in order. Failing segments are skipped; the stage
/// only fails when nothing at all could be materialized.
pub async fn materialize<E, F>(
    engine: &E,
    fetcher: &F,
    arena: &mut ScratchArena,
    segments: &[Segment],
    options: &MaterializeOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<StageReport<MaterializedSegment>, PipelineError>
where
    E: TranscodeEngine + ?Sized,
    F: AssetFetcher + ?Sized,
{
    let total = segments.len();
    // Built up front rather than inside a stream combinator closure, which
    // would keep the pipeline future from being `Send`.
    let downloads: Vec<_> = segments
        .iter()
        .enumerate()
        .map(move |(position, segment)| async move {
            progress.notify(&ProgressEvent::Processing { position, total });
            let assets = fetch_assets(fetcher, segment, &options.fetch).await;
            (position, segment, assets)
        })
        .collect();
    // Ordered: engine writes still happen strictly by position.
    let fetched = futures::stream::iter(downloads).buffered(options.concurrency.max(1));
    futures::pin_mut!(fetched);

    let mut report = StageReport::default();
    while let Some((position, segment, assets)) = cancellable(cancel, fetched.next()).await? {
        let outcome = place(engine, arena, position, segment, assets, options, cancel).await?;
        if let SegmentOutcome::Skipped(skipped) = &outcome {
            tracing::warn!(
                position,
                segment_id = skipped.segment_id,
                reason = %skipped.reason,
                "skipping segment"
            );
            progress.notify(&ProgressEvent::SegmentSkipped {
                position,
                segment_id: skipped.segment_id,
                reason: skipped.reason.clone(),
            });
        }
        report.push(outcome);
    }

    if report.kept.is_empty() {
        return Err(PipelineError::NoValidSegments(report.skipped));
    }
    tracing::info!(
        kept = report.kept.len(),
        skipped = report.skipped.len(),
        "segments materialized"
    );
    Ok(report)
}

async fn place<E>(
    engine: &E,
    arena: &mut ScratchArena,
    position: usize,
    segment: &Segment,
    assets: FetchedAssets,
    options: &MaterializeOptions,
    cancel: &CancellationToken,
) -> Result<SegmentOutcome<MaterializedSegment>, PipelineError>
where
    E: TranscodeEngine + ?Sized,
{
    let skip = |reason: String| {
        SegmentOutcome::Skipped(SkippedSegment {
            position,
            segment_id: segment.segment_id,
            stage: SkipStage::Materialize,
            reason,
        })
    };
    let duration = segment.effective_duration(options.default_duration);

    let image_bytes = match assets.image {
        Ok(bytes) => bytes,
        Err(e) => return Ok(skip(format!("image download failed: {}", e))),
    };
    let image = ScratchArena::image_name(position, image_extension(&image_bytes));
    if let Err(e) = cancellable(cancel, arena.write(engine, &image, &image_bytes)).await? {
        return Ok(skip(format!("could not store image: {}", e)));
    }

    let mut audio = None;
    match assets.audio {
        Some(Ok(bytes)) => {
            let name = ScratchArena::audio_name(position, audio_extension(&bytes));
            match cancellable(cancel, arena.write(engine, &name, &bytes)).await? {
                Ok(()) => audio = Some(name),
                Err(e) => tracing::warn!(position, error = %e, "could not store narration"),
            }
        }
        Some(Err(e)) => {
            tracing::warn!(position, error = %e, "narration download failed, using silence")
        }
        None => {}
    }

    let silent = audio.is_none();
    let audio = match audio {
        Some(name) => name,
        None => {
            let name = ScratchArena::audio_name(position, "m4a");
            let args = silence_args(duration, &name);
            if let Err(e) = cancellable(cancel, arena.exec(engine, &args, &name)).await? {
                return Ok(skip(format!("could not synthesize silence: {}", e)));
            }
            name
        }
    };

    Ok(SegmentOutcome::Kept(MaterializedSegment {
        position,
        segment_id: segment.segment_id,
        image,
        audio,
        duration,
        silent,
    }))
}
