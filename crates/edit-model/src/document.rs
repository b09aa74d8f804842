//! Persisted edit state for one source file.
//!
//! The document is what lets a command-line session pick up where the last
//! invocation left off: segments, regions, history and playhead are all
//! stored next to the probed media facts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cliptrim_common::{ClipError, EditingConfig};

use crate::editor::{AudioTrackSelection, Editor};
use crate::history::HistoryStack;
use crate::region::RegionSet;
use crate::segment::Segment;

/// Current document schema version.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Facts about the source media, gathered once on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration_ms: i64,
    pub width: u32,
    pub height: u32,
    /// Size of the source file in bytes.
    pub file_size: u64,
    /// Number of audio streams; zero is stored as one.
    pub audio_tracks: usize,
}

impl MediaInfo {
    /// Source file name without extension, used for export names.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string())
    }
}

/// On-disk edit document (`*.cliptrim.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditDocument {
    /// Schema version.
    pub version: String,

    pub media: MediaInfo,

    /// Whether the source carries an audio stream.
    #[serde(default = "default_true")]
    pub has_audio: bool,

    #[serde(default)]
    pub audio_track_index: usize,

    /// Export file name without extension, replacing the generated one.
    #[serde(default)]
    pub custom_name: Option<String>,

    pub segments: Vec<Segment>,

    #[serde(default)]
    pub regions: RegionSet,

    #[serde(default)]
    pub history: HistoryStack,

    #[serde(default)]
    pub playhead_ms: i64,
}

fn default_true() -> bool {
    true
}

impl EditDocument {
    /// A fresh document covering the whole source.
    pub fn new(media: MediaInfo, has_audio: bool, config: &EditingConfig) -> Self {
        let mut editor = Editor::new(config.clone());
        editor.load_media(media.duration_ms, media.audio_tracks);
        let mut doc = Self {
            version: DOCUMENT_VERSION.to_string(),
            media,
            has_audio,
            audio_track_index: 0,
            custom_name: None,
            segments: Vec::new(),
            regions: RegionSet::default(),
            history: HistoryStack::new(config.history_capacity),
            playhead_ms: 0,
        };
        doc.store(&editor);
        doc
    }

    /// Default document path for a source: `<source>.cliptrim.json`.
    pub fn default_path_for(source: &Path) -> PathBuf {
        let mut name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".cliptrim.json");
        source.with_file_name(name)
    }

    /// Rebuild the editing session from this document.
    pub fn to_editor(&self, config: &EditingConfig) -> Result<Editor, DocumentError> {
        Editor::restore(
            config.clone(),
            self.media.duration_ms,
            self.segments.clone(),
            self.history.clone(),
            self.regions.clone(),
            self.playhead_ms,
            AudioTrackSelection {
                index: self.audio_track_index,
                count: self.media.audio_tracks.max(1),
            },
        )
        .map_err(|e| DocumentError::ValidationError {
            message: e.to_string(),
        })
    }

    /// Copy the editor's state back into the document.
    pub fn store(&mut self, editor: &Editor) {
        self.segments = editor.segments().to_vec();
        self.history = editor.history().clone();
        self.regions = editor.regions().clone();
        self.playhead_ms = editor.playhead_ms();
        self.audio_track_index = editor.audio_track().index;
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DocumentError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let doc: Self = serde_json::from_str(&json).map_err(|e| DocumentError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if doc.version != DOCUMENT_VERSION {
            return Err(DocumentError::ValidationError {
                message: format!("unsupported document version {}", doc.version),
            });
        }
        Ok(doc)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| DocumentError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| DocumentError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when reading or writing edit documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid document: {message}")]
    ValidationError { message: String },
}

impl From<DocumentError> for ClipError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::IoError { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                ClipError::FileNotFound { path }
            }
            DocumentError::IoError { path, source } => ClipError::Document {
                path,
                message: source.to_string(),
            },
            DocumentError::ParseError { path, source } => ClipError::Document {
                path,
                message: source.to_string(),
            },
            DocumentError::ValidationError { message } => ClipError::invalid_state(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistorySnapshot;
    use crate::region::{FilterMode, FilterRegion};

    fn media() -> MediaInfo {
        MediaInfo {
            path: PathBuf::from("/videos/match.mp4"),
            duration_ms: 30_000,
            width: 1920,
            height: 1080,
            file_size: 50 * 1024 * 1024,
            audio_tracks: 2,
        }
    }

    #[test]
    fn test_new_document_covers_source() {
        let doc = EditDocument::new(media(), true, &EditingConfig::default());
        assert_eq!(doc.segments, vec![Segment::new(0, 30_000)]);
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert!(!doc.history.can_undo());
    }

    #[test]
    fn test_default_path_appends_suffix() {
        let path = EditDocument::default_path_for(Path::new("/videos/match.mp4"));
        assert_eq!(path, PathBuf::from("/videos/match.mp4.cliptrim.json"));
    }

    #[test]
    fn test_save_and_load_keeps_edit_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.cliptrim.json");
        let config = EditingConfig::default();

        let mut doc = EditDocument::new(media(), true, &config);
        let mut editor = doc.to_editor(&config).unwrap();
        editor.split_at(10_000);
        editor.delete_segments(&[0]);
        editor.cycle_audio_track();
        editor.regions_mut().add_region(FilterRegion::from_corners(
            0.1,
            0.1,
            0.3,
            0.3,
            FilterMode::Pixelate,
        ));
        doc.store(&editor);
        doc.save(&path).unwrap();

        let loaded = EditDocument::load(&path).unwrap();
        let mut restored = loaded.to_editor(&config).unwrap();
        assert_eq!(restored.segments(), &[Segment::new(10_000, 30_000)]);
        assert_eq!(restored.audio_track().index, 1);
        assert_eq!(restored.regions().regions.len(), 1);
        assert_eq!(restored.history().undo_depth(), 2);

        assert!(restored.undo());
        assert!(restored.undo());
        assert_eq!(restored.segments(), &[Segment::new(0, 30_000)]);
    }

    #[test]
    fn test_load_missing_maps_to_file_not_found() {
        let err = EditDocument::load("/nonexistent/doc.cliptrim.json").unwrap_err();
        let err: ClipError = err.into();
        assert!(matches!(err, ClipError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc = EditDocument::new(media(), false, &EditingConfig::default());
        doc.version = "9.9".to_string();
        doc.save(&path).unwrap();

        assert!(matches!(
            EditDocument::load(&path),
            Err(DocumentError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_history_past_media_end_rejected_on_restore() {
        let mut doc = EditDocument::new(media(), true, &EditingConfig::default());
        doc.history
            .save(HistorySnapshot::new(&[Segment::new(0, 40_000)]));
        assert!(doc.to_editor(&EditingConfig::default()).is_err());
    }

    #[test]
    fn test_restore_uses_configured_history_capacity() {
        let config = EditingConfig::default();
        let mut doc = EditDocument::new(media(), true, &config);
        let mut editor = doc.to_editor(&config).unwrap();
        for at in [5_000, 10_000, 15_000, 20_000] {
            editor.split_at(at);
        }
        doc.store(&editor);
        assert_eq!(doc.history.capacity(), 50);

        let small = EditingConfig {
            history_capacity: 2,
            ..EditingConfig::default()
        };
        let mut restored = doc.to_editor(&small).unwrap();
        assert_eq!(restored.history().capacity(), 2);
        assert_eq!(restored.history().undo_depth(), 2);

        assert!(restored.undo());
        assert!(restored.undo());
        assert!(!restored.undo());
        assert_eq!(restored.segments().len(), 3);
    }

    #[test]
    fn test_corrupt_segments_rejected_on_restore() {
        let mut doc = EditDocument::new(media(), true, &EditingConfig::default());
        doc.segments = vec![Segment::new(5_000, 4_000)];
        assert!(doc.to_editor(&EditingConfig::default()).is_err());
    }
}
