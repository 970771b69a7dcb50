//! Engine command lines for the three pipeline stages.
//!
//! Every clip is produced with the same geometry, pixel format, frame rate and
//! audio layout so the final concatenation can stream-copy without re-encoding.

use super::segment::MIN_SEGMENT_SECS;
use std::fmt::Write as _;

pub const AUDIO_SAMPLE_RATE: u32 = 44_100;
pub const AUDIO_CHANNELS: u32 = 2;
pub const OUTPUT_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, thiserror::Error)]
#[error("invalid encode settings: {0}")]
pub struct InvalidSettings(pub String);

#[derive(Clone, Debug, PartialEq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub preset: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            preset: String::from("veryfast"),
        }
    }
}

impl EncodeSettings {
    pub fn validate(&self) -> Result<(), InvalidSettings> {
        if self.width == 0 || self.height == 0 {
            return Err(InvalidSettings("width/height must be non-zero".into()));
        }
        if self.fps == 0 {
            return Err(InvalidSettings("fps must be non-zero".into()));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(InvalidSettings(
                "width/height must be even (required for yuv420p output)".into(),
            ));
        }
        if self.preset.trim().is_empty() {
            return Err(InvalidSettings("x264 preset must not be empty".into()));
        }
        Ok(())
    }

    /// Fit inside the frame keeping aspect ratio, then pad to fill it.
    pub fn video_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,format=yuv420p"
        )
    }
}

fn seconds(duration: f64) -> String {
    // `-t 0.000` would yield an empty stream.
    format!("{:.3}", duration.max(MIN_SEGMENT_SECS))
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Silent stereo AAC track of exactly `duration` seconds.
pub fn silence_args(duration: f64, output: &str) -> Vec<String> {
    let source = format!("anullsrc=r={}:cl=stereo", AUDIO_SAMPLE_RATE);
    let duration = seconds(duration);
    argv(&[
        "-y", "-f", "lavfi", "-i", &source, "-t", &duration, "-c:a", "aac", "-b:a", "128k",
        output,
    ])
}

/// One still image held for `duration` seconds over its narration track.
pub fn clip_args(
    settings: &EncodeSettings,
    image: &str,
    audio: &str,
    duration: f64,
    output: &str,
) -> Vec<String> {
    let fps = settings.fps.to_string();
    let filter = settings.video_filter();
    let sample_rate = AUDIO_SAMPLE_RATE.to_string();
    let channels = AUDIO_CHANNELS.to_string();
    let duration = seconds(duration);
    argv(&[
        "-y",
        "-loop",
        "1",
        "-framerate",
        &fps,
        "-i",
        image,
        "-i",
        audio,
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-vf",
        &filter,
        "-c:v",
        "libx264",
        "-preset",
        &settings.preset,
        "-tune",
        "stillimage",
        "-pix_fmt",
        "yuv420p",
        "-r",
        &fps,
        "-c:a",
        "aac",
        "-ar",
        &sample_rate,
        "-ac",
        &channels,
        "-t",
        &duration,
        "-shortest",
        "-movflags",
        "+faststart",
        output,
    ])
}

/// Stream-copy concatenation of the clips listed in `manifest`.
pub fn concat_args(manifest: &str, output: &str) -> Vec<String> {
    argv(&[
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
        manifest,
        "-c",
        "copy",
        "-movflags",
        "+faststart",
        output,
    ])
}

/// Ordered clip list in the concat demuxer's format.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConcatManifest {
    entries: Vec<String>,
}

impl ConcatManifest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            // Single quotes close, get escaped, and reopen.
            let escaped = entry.replace('\'', r"'\''");
            let _ = writeln!(out, "file '{}'", escaped);
        }
        out
    }
}

impl<S: Into<String>> FromIterator<S> for ConcatManifest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
