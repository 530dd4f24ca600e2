use serde::{Deserialize, Serialize};

/// Coarse resolution bucket, derived from pixel height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionLabel {
    Sd,
    Hd720,
    Hd1080,
    Uhd4k,
}

impl ResolutionLabel {
    #[must_use]
    pub const fn from_height(height: i32) -> Self {
        if height >= 2000 {
            Self::Uhd4k
        } else if height >= 1000 {
            Self::Hd1080
        } else if height >= 700 {
            Self::Hd720
        } else {
            Self::Sd
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sd => "SD",
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4K",
        }
    }
}

/// Immutable description of a video file's technical characteristics, as
/// read from the container by `parser::media::extract_media_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub resolution_width: i32,
    pub resolution_height: i32,
    pub resolution_label: ResolutionLabel,
    /// Normalized codec name (x264, x265, av1, …).
    pub video_codec: String,
    /// Ordered, normalized audio codec names (AC3, DTS-HD, …).
    pub audio_codecs: Vec<String>,
    /// Normalized channel layout label (2.0, 5.1, 7.1, …) of the primary
    /// audio stream, when known.
    pub audio_channels: Option<String>,
    /// Ordered ISO-639-1 language codes of the audio streams.
    pub audio_languages: Vec<String>,
    pub duration_seconds: f64,
    pub container: String,
}

impl MediaInfo {
    #[must_use]
    pub fn resolution_str(&self) -> &'static str {
        self.resolution_label.as_str()
    }

    #[must_use]
    pub fn quality_str(&self) -> String {
        format!(
            "{} {} ({})",
            self.resolution_str(),
            self.video_codec,
            self.audio_channels.as_deref().unwrap_or("stereo")
        )
    }
}
