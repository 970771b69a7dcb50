//! Reelwright - slideshow video assembly
//!
//! Turns an ordered list of segments (image, optional narration, duration)
//! into one MP4 through three stages: materialize assets, encode one clip per
//! segment, concatenate.
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (segments, media sniffing, engine command lines)
//! - ports/: Trait definitions (transcode engine, asset fetcher, progress)
//! - adapters/: Concrete implementations (ffmpeg CLI, reqwest)
//! - application/: The pipeline itself
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use adapters::http::HttpFetcher;
pub use adapters::local::FfmpegEngine;
pub use application::{PipelineError, VideoPipeline};
pub use config::{AppConfig, EngineConfig, PipelineConfig};
pub use domain::segment::{Segment, SkipStage, SkippedSegment};
pub use domain::video::VideoBlob;
pub use ports::{ProgressEvent, ProgressSink};
