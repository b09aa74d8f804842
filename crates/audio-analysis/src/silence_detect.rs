//! Silence detection through ffmpeg's `silencedetect` filter.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use cliptrim_common::{ClipError, ClipResult, SilenceSettings};
use cliptrim_processing_core::{parse_silence_markers, SilenceMarkers};

/// Runs `silencedetect` over one audio stream of a source file.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    ffmpeg: String,
    noise_db: f64,
    min_silence_s: f64,
}

impl SilenceDetector {
    pub fn new(ffmpeg: impl Into<String>, settings: &SilenceSettings) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            noise_db: settings.noise_db,
            min_silence_s: settings.min_silence_s,
        }
    }

    /// The `-af` filter expression.
    pub fn filter(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={}",
            self.noise_db, self.min_silence_s
        )
    }

    /// Full argument list for analysing `audio_track` of `source`.
    pub fn args(&self, source: &Path, audio_track: usize) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-map".to_string(),
            format!("0:a:{audio_track}?"),
            "-af".to_string(),
            self.filter(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }

    /// Run detection to completion. There is no timeout; a long source
    /// takes as long as ffmpeg needs to decode its audio.
    pub async fn detect(&self, source: &Path, audio_track: usize) -> ClipResult<SilenceMarkers> {
        if !source.exists() {
            return Err(ClipError::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        let args = self.args(source, audio_track);
        tracing::info!(
            source = %source.display(),
            audio_track,
            filter = %self.filter(),
            "Running silence detection"
        );
        tracing::debug!(args = ?args, "Spawning ffmpeg");

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ClipError::spawn(&self.ffmpeg, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::warn!(status = %output.status, "Silence detection failed");
            return Err(ClipError::external(&self.ffmpeg, output.status, &stderr));
        }

        let markers = parse_silence_markers(&stderr);
        tracing::info!(
            silences = markers.starts.len(),
            "Silence detection finished"
        );
        Ok(markers)
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new("ffmpeg", &SilenceSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_expression() {
        assert_eq!(
            SilenceDetector::default().filter(),
            "silencedetect=noise=-45dB:d=0.3"
        );
    }

    #[test]
    fn test_args_select_audio_track() {
        let args = SilenceDetector::default().args(Path::new("/tmp/in.mp4"), 2);
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert_eq!(args[map + 1], "0:a:2?");
        assert_eq!(args.last().map(String::as_str), Some("-"));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "null"));
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let err = SilenceDetector::default()
            .detect(Path::new("/nonexistent/clip.mp4"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"not a video").unwrap();

        let detector = SilenceDetector::new(
            "/nonexistent/bin/ffmpeg-cliptrim",
            &SilenceSettings::default(),
        );
        let err = detector.detect(&source, 0).await.unwrap_err();
        assert!(matches!(err, ClipError::ProcessSpawn { .. }));
        assert!(err.is_external());
    }
}
