use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reelwright::ports::{AssetFetcher, TranscodeEngine};
use reelwright::{
    AppConfig, FfmpegEngine, HttpFetcher, PipelineError, ProgressEvent, Segment, VideoPipeline,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const CLIPS_HEADER: HeaderName = HeaderName::from_static("x-reelwright-clips");
const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-reelwright-skipped");

struct AppState<E, F> {
    pipeline: Arc<VideoPipeline<E, F>>,
    shutdown: CancellationToken,
}

impl<E, F> Clone for AppState<E, F> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            shutdown: self.shutdown.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    segments: Vec<Segment>,
}

#[tokio::main]
async fn main() {
    // `.env` may carry RUST_LOG, and config parsing logs its warnings.
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let engine = match FfmpegEngine::new(&config.engine).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "could not start the transcode engine");
            std::process::exit(1);
        }
    };
    tracing::info!(scratch = %engine.scratch_dir().display(), "transcode engine ready");

    let pipeline = match VideoPipeline::new(engine, HttpFetcher::new(), config.pipeline.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "invalid pipeline configuration");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let app = router(
        Arc::new(pipeline),
        shutdown.clone(),
        config.server.max_request_bytes,
    );

    let bind = format!("{}:{}", config.server.addr, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %bind, error = %e, "failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    tracing::info!("Listening at {}", bind);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await;
    if let Err(e) = result {
        tracing::error!(error = %e, "server error");
    }
}

fn router<E, F>(
    pipeline: Arc<VideoPipeline<E, F>>,
    shutdown: CancellationToken,
    max_request_bytes: usize,
) -> Router
where
    E: TranscodeEngine + 'static,
    F: AssetFetcher + 'static,
{
    Router::new()
        .route("/videos", post(generate_video::<E, F>))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .with_state(AppState { pipeline, shutdown })
}

// The run happens on its own task so that dropping this handler (client gone)
// only fires the guard; the pipeline then observes the cancellation and
// cleans its scratch files before returning.
async fn generate_video<E, F>(
    State(state): State<AppState<E, F>>,
    Json(request): Json<GenerateRequest>,
) -> Response
where
    E: TranscodeEngine + 'static,
    F: AssetFetcher + 'static,
{
    let token = state.shutdown.child_token();
    let guard = token.clone().drop_guard();
    let pipeline = state.pipeline;

    let task = tokio::spawn(async move {
        let progress = |event: &ProgressEvent| match event.percent() {
            Some(percent) => tracing::info!(percent, "{}", event),
            None => tracing::info!("{}", event),
        };
        pipeline
            .generate_video(&request.segments, Some(&progress), &token)
            .await
    });
    let joined = task.await;
    guard.disarm();

    match joined {
        Ok(Ok(video)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, video.mime_type.to_string()),
                (CLIPS_HEADER, video.clip_count.to_string()),
                (SKIPPED_HEADER, video.skipped.len().to_string()),
            ],
            video.bytes,
        )
            .into_response(),
        Ok(Err(e)) => failure(e),
        Err(e) => {
            tracing::error!(error = %e, "generation task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "internal error" })),
            )
                .into_response()
        }
    }
}

fn failure(error: PipelineError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "success": false, "error": error.to_string() })),
    )
        .into_response()
}
