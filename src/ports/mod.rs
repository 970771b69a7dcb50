//! Ports - Trait definitions for the pipeline's external seams.

pub mod engine;
pub mod fetcher;
pub mod progress;

pub use engine::{EngineError, EngineLog, TranscodeEngine};
pub use fetcher::{AssetFetcher, FetchError, FetchOptions};
pub use progress::{ProgressEvent, ProgressSink};
