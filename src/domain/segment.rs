use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback length used when a segment carries no usable duration.
pub const DEFAULT_SEGMENT_SECS: f64 = 5.0;

/// Shortest duration the engine command lines can express (millisecond precision).
pub const MIN_SEGMENT_SECS: f64 = 0.001;

/// One slide of the output video, as handed over by the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub segment_id: i64,
    pub image_url: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub script_text: String,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Segment {
    pub fn new(segment_id: i64, image_url: impl Into<String>) -> Self {
        Self {
            segment_id,
            image_url: image_url.into(),
            audio_url: None,
            script_text: String::new(),
            duration: None,
        }
    }

    pub fn with_audio(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Declared duration, or `default` when missing, not finite, or too short
    /// to survive millisecond rounding.
    pub fn effective_duration(&self, default: f64) -> f64 {
        match self.duration {
            Some(d) if d.is_finite() && d >= MIN_SEGMENT_SECS => d,
            _ => default,
        }
    }

    /// Narration URL, treating blank strings as absent.
    pub fn narration_url(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Stage at which a segment was dropped from the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Materialize,
    Encode,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipStage::Materialize => write!(f, "materialize"),
            SkipStage::Encode => write!(f, "encode"),
        }
    }
}

/// A segment that was logged and dropped under the silent-skip policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSegment {
    pub position: usize,
    pub segment_id: i64,
    pub stage: SkipStage,
    pub reason: String,
}
