//! Positional naming of scratch files for one pipeline invocation.
//!
//! Names are derived from the segment's position in the input, never from its
//! `segment_id`, so a rerun with the same input overwrites the same files.

use crate::ports::engine::{EngineError, TranscodeEngine};

pub const MANIFEST_NAME: &str = "concat.txt";
pub const OUTPUT_NAME: &str = "output.mp4";

#[derive(Debug, Default)]
pub struct ScratchArena {
    written: Vec<String>,
}

impl ScratchArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_name(position: usize, extension: &str) -> String {
        format!("image_{}.{}", position, extension)
    }

    pub fn audio_name(position: usize, extension: &str) -> String {
        format!("audio_{}.{}", position, extension)
    }

    pub fn clip_name(position: usize) -> String {
        format!("clip_{}.mp4", position)
    }

    fn track(&mut self, name: &str) {
        if !self.written.iter().any(|n| n == name) {
            self.written.push(name.to_string());
        }
    }

    pub async fn write<E>(&mut self, engine: &E, name: &str, data: &[u8]) -> Result<(), EngineError>
    where
        E: TranscodeEngine + ?Sized,
    {
        self.track(name);
        engine.write_file(name, data).await
    }

    /// Run a command producing `output`. The output is tracked even when the
    /// command fails, since a partial file may be left behind.
    pub async fn exec<E>(
        &mut self,
        engine: &E,
        args: &[String],
        output: &str,
    ) -> Result<(), EngineError>
    where
        E: TranscodeEngine + ?Sized,
    {
        self.track(output);
        engine.exec(args).await
    }

    /// Delete everything this invocation wrote. Best effort.
    pub async fn clear<E>(&mut self, engine: &E)
    where
        E: TranscodeEngine + ?Sized,
    {
        for name in self.written.drain(..) {
            if let Err(e) = engine.delete_file(&name).await {
                tracing::warn!(file = %name, error = %e, "failed to remove scratch file");
            }
        }
    }
}
