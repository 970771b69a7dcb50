use super::commands::OUTPUT_MIME_TYPE;
use super::segment::SkippedSegment;
use bytes::Bytes;

/// The finished video. Ownership passes entirely to the caller.
#[derive(Debug, Clone)]
pub struct VideoBlob {
    pub bytes: Bytes,
    pub mime_type: &'static str,
    /// Number of clips concatenated into `bytes`.
    pub clip_count: usize,
    /// Segments dropped along the way, in input order.
    pub skipped: Vec<SkippedSegment>,
}

impl VideoBlob {
    pub fn mp4(bytes: Bytes, clip_count: usize, skipped: Vec<SkippedSegment>) -> Self {
        Self {
            bytes,
            mime_type: OUTPUT_MIME_TYPE,
            clip_count,
            skipped,
        }
    }
}
