//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline editing limits.
    pub editing: EditingConfig,

    /// Silence detection and auto-cut parameters.
    pub silence: SilenceSettings,

    /// Export defaults.
    pub export: ExportSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Limits applied by timeline edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    /// A split must land further than this from both segment boundaries.
    pub split_margin_ms: i64,

    /// Shortest segment a resize may produce.
    pub min_segment_ms: i64,

    /// Undo depth before the oldest snapshot is evicted.
    pub history_capacity: usize,

    /// Coarse playhead step.
    pub nudge_ms: i64,

    /// Fine playhead step (roughly one frame at 60fps).
    pub fine_step_ms: i64,
}

/// Parameters for silence analysis and the auto-cut pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceSettings {
    /// Noise floor passed to `silencedetect`, in dB.
    pub noise_db: f64,

    /// Minimum silence duration passed to `silencedetect`, in seconds.
    pub min_silence_s: f64,

    /// Padding kept around speech on both sides, in seconds.
    pub padding_s: f64,

    /// Speech spans at or below this length are dropped, in seconds.
    pub min_span_s: f64,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// ffmpeg executable.
    pub ffmpeg_path: String,

    /// ffprobe executable.
    pub ffprobe_path: String,

    /// Override for the export directory. Defaults to `<Movies>/<subfolder>`.
    pub output_dir: Option<PathBuf>,

    /// Folder created under the platform movies directory.
    pub subfolder: String,

    /// Probe for a hardware H.264 encoder before falling back to libx264.
    pub prefer_hardware: bool,

    /// Target output size for video exports, in MiB.
    pub video_budget_mib: f64,

    /// Target output size for muted exports, in MiB.
    pub muted_budget_mib: f64,

    /// Muted exports estimated above this switch to a bitrate target, in MiB.
    pub muted_threshold_mib: f64,

    /// Audio bitrate reserved out of the video budget, in bits per second.
    pub audio_bitrate_bps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cliptrim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            split_margin_ms: 200,
            min_segment_ms: 100,
            history_capacity: 50,
            nudge_ms: 2000,
            fine_step_ms: 16,
        }
    }
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            noise_db: -45.0,
            min_silence_s: 0.3,
            padding_s: 0.2,
            min_span_s: 0.1,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            output_dir: None,
            subfolder: "Edited".to_string(),
            prefer_hardware: true,
            video_budget_mib: 6.7,
            muted_budget_mib: 7.5,
            muted_threshold_mib: 8.0,
            audio_bitrate_bps: 32_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cliptrim").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_limits() {
        let config = AppConfig::default();
        assert_eq!(config.editing.split_margin_ms, 200);
        assert_eq!(config.editing.min_segment_ms, 100);
        assert_eq!(config.editing.history_capacity, 50);
        assert_eq!(config.export.subfolder, "Edited");
        assert_eq!(config.export.audio_bitrate_bps, 32_000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "editing": { "history_capacity": 10 } }"#).unwrap();
        assert_eq!(config.editing.history_capacity, 10);
        assert_eq!(config.editing.split_margin_ms, 200);
        assert!((config.silence.padding_s - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(std::path::Path::new(
            "/nonexistent/cliptrim/config.json",
        ));
        assert_eq!(config.logging.level, "info");
    }
}
