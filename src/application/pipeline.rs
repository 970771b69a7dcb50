use super::arena::ScratchArena;
use super::concat::concatenate;
use super::encode::encode;
use super::error::PipelineError;
use super::materialize::{materialize, MaterializeOptions};
use super::report::cancellable;
use crate::config::PipelineConfig;
use crate::domain::segment::Segment;
use crate::domain::video::VideoBlob;
use crate::ports::engine::{EngineLog, TranscodeEngine};
use crate::ports::fetcher::{AssetFetcher, FetchOptions};
use crate::ports::progress::{ProgressEvent, ProgressSink};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

static NO_PROGRESS: fn(&ProgressEvent) = |_| {};

/// Client-side assembly of a slideshow video from remote assets.
///
/// The engine is injected fully initialised and is used exclusively by this
/// pipeline; invocations against it are serialised because all of them share
/// the engine's scratch namespace.
pub struct VideoPipeline<E, F> {
    engine: E,
    fetcher: F,
    config: PipelineConfig,
    run_lock: Mutex<()>,
}

impl<E, F> VideoPipeline<E, F>
where
    E: TranscodeEngine,
    F: AssetFetcher,
{
    pub fn new(engine: E, fetcher: F, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.encode.validate()?;
        Ok(Self {
            engine,
            fetcher,
            config,
            run_lock: Mutex::new(()),
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generate without progress reporting or external cancellation.
    pub async fn generate(&self, segments: &[Segment]) -> Result<VideoBlob, PipelineError> {
        self.generate_video(segments, None, &CancellationToken::new())
            .await
    }

    /// Assemble `segments` into one MP4.
    ///
    /// Segments whose image cannot be fetched or whose clip cannot be encoded
    /// are dropped; the output keeps the input order of what remains.
    pub async fn generate_video(
        &self,
        segments: &[Segment],
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<VideoBlob, PipelineError> {
        let progress = progress.unwrap_or(&NO_PROGRESS);
        let Some(limit) = self.config.timeout else {
            return self.run(segments, progress, cancel).await;
        };

        // Cancel on timeout rather than dropping the run, so scratch files
        // still get cleaned up.
        let token = cancel.child_token();
        let run = self.run(segments, progress, &token);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = tokio::time::sleep(limit) => {
                token.cancel();
                match run.await {
                    Err(PipelineError::Cancelled) if !cancel.is_cancelled() => {
                        tracing::error!(?limit, "video generation timed out");
                        Err(PipelineError::TimedOut(limit))
                    }
                    other => other,
                }
            }
        }
    }

    async fn run(
        &self,
        segments: &[Segment],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<VideoBlob, PipelineError> {
        let _guard = cancellable(cancel, self.run_lock.lock()).await?;
        let forwarder = tokio::spawn(forward_engine_logs(self.engine.subscribe_logs()));

        tracing::info!(segments = segments.len(), "starting video generation");
        progress.notify(&ProgressEvent::Started {
            total: segments.len(),
        });

        let mut arena = ScratchArena::new();
        let result = self.assemble(segments, progress, cancel, &mut arena).await;
        arena.clear(&self.engine).await;
        forwarder.abort();

        match &result {
            Ok(video) => {
                tracing::info!(
                    clips = video.clip_count,
                    skipped = video.skipped.len(),
                    bytes = video.bytes.len(),
                    "video generation finished"
                );
                progress.notify(&ProgressEvent::Completed {
                    clips: video.clip_count,
                    skipped: video.skipped.len(),
                });
            }
            Err(e) => tracing::error!(error = %e, "video generation failed"),
        }
        result
    }

    async fn assemble(
        &self,
        segments: &[Segment],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
        arena: &mut ScratchArena,
    ) -> Result<VideoBlob, PipelineError> {
        let options = MaterializeOptions {
            fetch: FetchOptions::with_timeout(self.config.fetch_timeout),
            default_duration: self.config.default_segment_secs,
            concurrency: self.config.fetch_concurrency,
        };

        let materialized = materialize(
            &self.engine,
            &self.fetcher,
            arena,
            segments,
            &options,
            progress,
            cancel,
        )
        .await?;

        let encoded = encode(
            &self.engine,
            arena,
            &materialized.kept,
            &self.config.encode,
            progress,
            cancel,
        )
        .await?;

        let bytes = concatenate(&self.engine, arena, &encoded.kept, progress, cancel).await?;

        let mut skipped = materialized.skipped;
        skipped.extend(encoded.skipped);
        skipped.sort_by_key(|s| s.position);
        Ok(VideoBlob::mp4(bytes, encoded.kept.len(), skipped))
    }
}

async fn forward_engine_logs(mut logs: broadcast::Receiver<EngineLog>) {
    loop {
        match logs.recv().await {
            Ok(log @ EngineLog::Progress { seconds, .. }) => {
                tracing::trace!(target: "engine", seconds, "{}", log.line())
            }
            Ok(log) => tracing::trace!(target: "engine", "{}", log.line()),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::trace!(missed, "engine log lagged")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
