//! Source probing with ffprobe.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use cliptrim_common::{ClipError, ClipResult};
use cliptrim_edit_model::MediaInfo;

/// Probed facts plus whether any audio stream exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedMedia {
    pub info: MediaInfo,
    pub has_audio: bool,
}

/// ffprobe front end.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl MediaProbe {
    pub fn new(ffprobe: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, args: &[&str], source: &Path) -> ClipResult<String> {
        if !source.exists() {
            return Err(ClipError::FileNotFound {
                path: source.to_path_buf(),
            });
        }
        tracing::debug!(args = ?args, source = %source.display(), "Running ffprobe");

        let output = Command::new(&self.ffprobe)
            .args(args)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ClipError::spawn(&self.ffprobe, e))?;

        if !output.status.success() {
            return Err(ClipError::external(
                &self.ffprobe,
                output.status,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Number of audio streams in `source`. May be zero.
    pub async fn audio_stream_count(&self, source: &Path) -> ClipResult<usize> {
        let stdout = self
            .run(
                &[
                    "-v",
                    "error",
                    "-select_streams",
                    "a",
                    "-show_entries",
                    "stream=index",
                    "-of",
                    "csv=p=0",
                ],
                source,
            )
            .await?;
        Ok(count_stream_lines(&stdout))
    }

    /// Duration, frame size, file size and audio streams of `source`.
    pub async fn probe(&self, source: &Path) -> ClipResult<ProbedMedia> {
        let json = self
            .run(
                &[
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration:stream=codec_type,width,height",
                    "-of",
                    "json",
                ],
                source,
            )
            .await?;
        let file_size = tokio::fs::metadata(source).await?.len();
        let probed = parse_probe_json(&json, source, file_size)?;

        tracing::info!(
            source = %source.display(),
            duration_ms = probed.info.duration_ms,
            width = probed.info.width,
            height = probed.info.height,
            audio_tracks = probed.info.audio_tracks,
            "Probed media"
        );
        Ok(probed)
    }
}

/// Count non-empty lines of `csv=p=0` stream output.
pub fn count_stream_lines(stdout: &str) -> usize {
    stdout.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Number of tracks a user can pick from. A source without audio still
/// exposes one (empty) selection.
pub fn selectable_tracks(stream_count: usize) -> usize {
    stream_count.max(1)
}

/// Interpret `ffprobe -of json` output.
pub fn parse_probe_json(json: &str, source: &Path, file_size: u64) -> ClipResult<ProbedMedia> {
    let output: ProbeOutput = serde_json::from_str(json)?;

    let duration_s = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| {
            ClipError::analysis(format!("no duration reported for {}", source.display()))
        })?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && s.width.is_some());
    let (width, height) = video
        .and_then(|s| Some((s.width?, s.height?)))
        .unwrap_or((0, 0));

    let audio_streams = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .count();

    Ok(ProbedMedia {
        info: MediaInfo {
            path: source.to_path_buf(),
            duration_ms: (duration_s * 1000.0).round() as i64,
            width,
            height,
            file_size,
            audio_tracks: selectable_tracks(audio_streams),
        },
        has_audio: audio_streams > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "programs": [],
        "streams": [
            { "codec_type": "video", "width": 1920, "height": 1080 },
            { "codec_type": "audio" },
            { "codec_type": "audio" }
        ],
        "format": { "duration": "31.466000" }
    }"#;

    #[test]
    fn test_parse_probe_json() {
        let probed = parse_probe_json(PROBE_JSON, Path::new("/v/a.mp4"), 1234).unwrap();
        assert_eq!(probed.info.duration_ms, 31_466);
        assert_eq!((probed.info.width, probed.info.height), (1920, 1080));
        assert_eq!(probed.info.audio_tracks, 2);
        assert_eq!(probed.info.file_size, 1234);
        assert!(probed.has_audio);
    }

    #[test]
    fn test_parse_probe_json_without_audio() {
        let json = r#"{ "streams": [{ "codec_type": "video", "width": 640, "height": 360 }],
                        "format": { "duration": "5.0" } }"#;
        let probed = parse_probe_json(json, Path::new("a.mp4"), 0).unwrap();
        assert_eq!(probed.info.audio_tracks, 1);
        assert!(!probed.has_audio);
    }

    #[test]
    fn test_parse_probe_json_requires_duration() {
        let json = r#"{ "streams": [], "format": {} }"#;
        let err = parse_probe_json(json, Path::new("a.mp4"), 0).unwrap_err();
        assert!(matches!(err, ClipError::Analysis { .. }));
    }

    #[test]
    fn test_stream_line_count() {
        assert_eq!(count_stream_lines("1\n2\n\n"), 2);
        assert_eq!(count_stream_lines(""), 0);
        assert_eq!(selectable_tracks(0), 1);
        assert_eq!(selectable_tracks(3), 3);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let err = MediaProbe::default()
            .audio_stream_count(Path::new("/nonexistent/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::FileNotFound { .. }));
    }
}
