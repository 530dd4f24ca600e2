use crate::error::{CoreError, CoreResult};
use crate::models::media::{MediaInfo, ResolutionLabel};
use std::path::Path;
use tracing::debug;

/// Reads container/stream metadata for a video file via `ffprobe`.
///
/// Duration is normalized to seconds: `ffprobe`'s `format.duration` is
/// already in seconds as a decimal string, but some stream-level
/// `duration_ts`-derived fields are reported in milliseconds by certain
/// muxers; callers that fall back to a stream-level duration must divide
/// by 1000 when the value is implausibly large for the codec in question.
pub fn extract_media_info(path: &Path) -> CoreResult<MediaInfo> {
    let output = ffprobe::ffprobe(path).map_err(|e| {
        CoreError::FilesystemIo(format!("ffprobe failed on {}: {e}", path.display()))
    })?;

    let video_stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CoreError::InvalidInput(format!("no video stream in {}", path.display())))?;

    let resolution_width = i32::try_from(video_stream.width.unwrap_or(0)).unwrap_or(0);
    let resolution_height = i32::try_from(video_stream.height.unwrap_or(0)).unwrap_or(0);
    let video_codec = video_stream
        .codec_name
        .as_deref()
        .map(normalize_video_codec)
        .unwrap_or_else(|| "unknown".to_string());

    let duration_seconds = output
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            video_stream.duration.as_ref().and_then(|d| {
                d.parse::<f64>().ok().map(|ms_or_s| {
                    // Some containers report stream duration in milliseconds;
                    // a video shorter than ~3s is implausible, so treat large
                    // values as milliseconds and convert down to seconds.
                    if ms_or_s > 36_000.0 {
                        ms_or_s / 1000.0
                    } else {
                        ms_or_s
                    }
                })
            })
        })
        .unwrap_or(0.0);

    let audio_streams: Vec<_> = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .collect();

    let audio_codecs: Vec<String> = audio_streams
        .iter()
        .filter_map(|s| s.codec_name.as_deref())
        .map(normalize_audio_codec)
        .collect();

    let audio_channels = audio_streams
        .first()
        .and_then(|s| s.channels)
        .map(|c| normalize_channel_layout(i32::try_from(c).unwrap_or(0)));

    let audio_languages: Vec<String> = audio_streams
        .iter()
        .filter_map(|s| s.tags.as_ref().and_then(|t| t.language.clone()))
        .collect();

    let container = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("unknown")
        .to_lowercase();

    debug!(
        path = %path.display(),
        width = resolution_width,
        height = resolution_height,
        codec = %video_codec,
        duration_seconds,
        "extracted media info"
    );

    Ok(MediaInfo {
        resolution_width,
        resolution_height,
        resolution_label: ResolutionLabel::from_height(resolution_height),
        video_codec,
        audio_codecs,
        audio_channels,
        audio_languages,
        duration_seconds,
        container,
    })
}

/// Normalizes an ffprobe/filename codec token to its canonical short name.
#[must_use]
pub fn normalize_video_codec(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "HEVC" | "H265" | "H.265" | "X265" => "x265".to_string(),
        "AVC" | "H264" | "H.264" | "X264" => "x264".to_string(),
        "AV1" => "av1".to_string(),
        other => other.to_lowercase(),
    }
}

#[must_use]
fn normalize_audio_codec(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "AC3" | "AC-3" => "AC3".to_string(),
        "EAC3" | "E-AC-3" => "EAC3".to_string(),
        "DTS-HD MA" | "DTSHD" | "DTS_HD_MA" => "DTS-HD".to_string(),
        "TRUEHD" => "TrueHD".to_string(),
        other => other.to_uppercase(),
    }
}

#[must_use]
fn normalize_channel_layout(channels: i32) -> String {
    match channels {
        1 => "1.0".to_string(),
        2 => "2.0".to_string(),
        6 => "5.1".to_string(),
        8 => "7.1".to_string(),
        n => format!("{n}ch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_normalization() {
        assert_eq!(normalize_video_codec("HEVC"), "x265");
        assert_eq!(normalize_video_codec("AVC"), "x264");
        assert_eq!(normalize_video_codec("h264"), "x264");
    }

    #[test]
    fn audio_codec_normalization() {
        assert_eq!(normalize_audio_codec("AC-3"), "AC3");
        assert_eq!(normalize_audio_codec("DTS-HD MA"), "DTS-HD");
    }
}
