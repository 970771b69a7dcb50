//! Local adapters: the ffmpeg engine running on this host.

pub mod ffmpeg;

pub use ffmpeg::FfmpegEngine;
