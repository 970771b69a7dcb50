//! Application layer - the three-stage assembly pipeline, generic over ports.

pub mod arena;
pub mod concat;
pub mod encode;
pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PipelineError;
pub use pipeline::VideoPipeline;
