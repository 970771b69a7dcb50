//! Configuration loaded from the environment (and `.env` when present).

use crate::domain::commands::EncodeSettings;
use crate::domain::segment::DEFAULT_SEGMENT_SECS;
use crate::ports::fetcher::DEFAULT_FETCH_TIMEOUT;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Request bodies carry inline `data:` assets, so the limit is well above
/// axum's 2 MB default.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// HTTP service settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Largest accepted request body
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Where and how the ffmpeg engine runs.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// ffmpeg executable, resolved through `PATH` when relative
    pub ffmpeg_bin: PathBuf,
    /// Scratch directory; a private temporary directory when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            scratch_dir: None,
        }
    }
}

/// Knobs of the assembly pipeline itself.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Timeout of each individual asset download
    pub fetch_timeout: Duration,
    /// Duration applied to segments without a usable one
    pub default_segment_secs: f64,
    /// Output geometry and encoder preset
    pub encode: EncodeSettings,
    /// Downloads in flight at once; 1 keeps fetching strictly sequential
    pub fetch_concurrency: usize,
    /// Upper bound for one whole invocation
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            default_segment_secs: DEFAULT_SEGMENT_SECS,
            encode: EncodeSettings::default(),
            fetch_concurrency: 1,
            timeout: None,
        }
    }
}

/// Full application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineConfig::default();
        let encode_defaults = EncodeSettings::default();

        let fetch_timeout_secs: u64 =
            parse_or(&lookup, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs());
        let default_segment_secs: f64 =
            parse_or(&lookup, "DEFAULT_SEGMENT_SECS", defaults.default_segment_secs);
        let timeout_secs: u64 = parse_or(&lookup, "PIPELINE_TIMEOUT_SECS", 0);

        Self {
            server: ServerConfig {
                addr: lookup("ADDR").unwrap_or_else(|| String::from("127.0.0.1")),
                port: lookup("PORT").unwrap_or_else(|| String::from("3000")),
                max_request_bytes: parse_or(
                    &lookup,
                    "MAX_REQUEST_BYTES",
                    DEFAULT_MAX_REQUEST_BYTES,
                ),
            },
            engine: EngineConfig {
                ffmpeg_bin: lookup("FFMPEG_BIN")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("ffmpeg")),
                scratch_dir: lookup("SCRATCH_DIR")
                    .filter(|dir| !dir.trim().is_empty())
                    .map(PathBuf::from),
            },
            pipeline: PipelineConfig {
                fetch_timeout: Duration::from_secs(fetch_timeout_secs.max(1)),
                default_segment_secs: if default_segment_secs > 0.0 {
                    default_segment_secs
                } else {
                    DEFAULT_SEGMENT_SECS
                },
                encode: EncodeSettings {
                    width: parse_or(&lookup, "OUTPUT_WIDTH", encode_defaults.width),
                    height: parse_or(&lookup, "OUTPUT_HEIGHT", encode_defaults.height),
                    fps: parse_or(&lookup, "OUTPUT_FPS", encode_defaults.fps),
                    preset: lookup("X264_PRESET").unwrap_or(encode_defaults.preset),
                },
                fetch_concurrency: parse_or(&lookup, "FETCH_CONCURRENCY", 1usize).max(1),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
        }
    }
}

fn parse_or<L, T>(lookup: &L, key: &str, default: T) -> T
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable setting");
                default
            }
        },
        None => default,
    }
}
