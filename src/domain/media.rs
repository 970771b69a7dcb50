//! Content sniffing for downloaded assets.
//!
//! The engine's image demuxer picks its decoder from the file extension, so
//! scratch names must carry one that matches the payload.

/// Still image container, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
}

impl ImageKind {
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else if data.starts_with(b"BM") {
            Some(ImageKind::Bmp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
            ImageKind::Bmp => "bmp",
        }
    }
}

/// Extension for an image payload; unknown payloads are assumed to be JPEG.
pub fn image_extension(data: &[u8]) -> &'static str {
    ImageKind::sniff(data)
        .map(|kind| kind.extension())
        .unwrap_or("jpg")
}

/// Narration container, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Mp3,
    Wav,
    Ogg,
    Flac,
    Mp4,
    Webm,
}

impl AudioKind {
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0)
        {
            Some(AudioKind::Mp3)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            Some(AudioKind::Wav)
        } else if data.starts_with(b"OggS") {
            Some(AudioKind::Ogg)
        } else if data.starts_with(b"fLaC") {
            Some(AudioKind::Flac)
        } else if data.len() >= 8 && &data[4..8] == b"ftyp" {
            Some(AudioKind::Mp4)
        } else if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            Some(AudioKind::Webm)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioKind::Mp3 => "mp3",
            AudioKind::Wav => "wav",
            AudioKind::Ogg => "ogg",
            AudioKind::Flac => "flac",
            AudioKind::Mp4 => "m4a",
            AudioKind::Webm => "webm",
        }
    }
}

/// Extension for a narration payload; the engine probes unknown audio itself.
pub fn audio_extension(data: &[u8]) -> &'static str {
    AudioKind::sniff(data)
        .map(|kind| kind.extension())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_images() {
        assert_eq!(
            ImageKind::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageKind::Png)
        );
        assert_eq!(
            ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(
            ImageKind::sniff(b"RIFF\x24\0\0\0WEBPVP8 "),
            Some(ImageKind::Webp)
        );
        assert_eq!(ImageKind::sniff(b"GIF89a..."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"<html>"), None);
    }

    #[test]
    fn test_image_extension_defaults_to_jpg() {
        assert_eq!(image_extension(b"not an image"), "jpg");
        assert_eq!(image_extension(b"\x89PNG\r\n\x1a\n"), "png");
    }

    #[test]
    fn test_sniff_audio() {
        assert_eq!(AudioKind::sniff(b"ID3\x04\0\0"), Some(AudioKind::Mp3));
        assert_eq!(AudioKind::sniff(&[0xFF, 0xFB, 0x90, 0x64]), Some(AudioKind::Mp3));
        assert_eq!(
            AudioKind::sniff(b"RIFF\x24\0\0\0WAVEfmt "),
            Some(AudioKind::Wav)
        );
        assert_eq!(AudioKind::sniff(b"\0\0\0\x20ftypM4A "), Some(AudioKind::Mp4));
        assert_eq!(AudioKind::sniff(b"OggS\0\x02"), Some(AudioKind::Ogg));
        assert_eq!(audio_extension(b"????"), "bin");
    }
}
