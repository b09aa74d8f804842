//! Subcommand implementations and the document session they share.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Subcommand, ValueEnum};

use cliptrim_common::AppConfig;
use cliptrim_edit_model::{CropRect, Edge, EditDocument, Editor, FilterMode};
use cliptrim_render_engine::{ExportGate, ExportMode};

pub mod autocut;
pub mod check;
pub mod edit;
pub mod export;
pub mod info;
pub mod init;
pub mod plan;
pub mod regions;
pub mod tracks;

const DOCUMENT_SUFFIX: &str = ".cliptrim.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EdgeArg {
    Start,
    End,
}

impl From<EdgeArg> for Edge {
    fn from(edge: EdgeArg) -> Self {
        match edge {
            EdgeArg::Start => Edge::Start,
            EdgeArg::End => Edge::End,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Video,
    Audio,
    Gif,
    Muted,
}

impl From<ModeArg> for ExportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Video => ExportMode::Video,
            ModeArg::Audio => ExportMode::Audio,
            ModeArg::Gif => ExportMode::Gif,
            ModeArg::Muted => ExportMode::MutedVideo,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum RegionAction {
    /// Add a region from two opposite corners (normalized)
    Add {
        /// Corners as `x0,y0,x1,y1`
        corners: String,

        /// blur, pixelate or solid
        #[arg(long, default_value = "blur")]
        mode: String,
    },
    /// Remove a region by index
    Remove { index: usize },
    /// Change a region's filter mode (cycles when no mode is given)
    Mode { index: usize, mode: Option<String> },
    /// Remove every region
    Clear,
    /// List regions
    List,
}

/// Document path for a source or document argument.
pub fn document_path(target: &Path) -> PathBuf {
    let is_document = target
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(DOCUMENT_SUFFIX))
        .unwrap_or(false);
    if is_document {
        target.to_path_buf()
    } else {
        EditDocument::default_path_for(target)
    }
}

/// A loaded document plus the editor rebuilt from it.
pub struct Session {
    pub path: PathBuf,
    pub doc: EditDocument,
    pub editor: Editor,
}

impl Session {
    pub fn open(config: &AppConfig, target: &Path) -> anyhow::Result<Self> {
        let path = document_path(target);
        let doc = EditDocument::load(&path).with_context(|| {
            format!(
                "Failed to load edit document {} (run `cliptrim init` first)",
                path.display()
            )
        })?;
        let editor = doc
            .to_editor(&config.editing)
            .with_context(|| format!("Invalid edit document {}", path.display()))?;
        Ok(Self { path, doc, editor })
    }

    pub fn save(mut self) -> anyhow::Result<()> {
        self.doc.store(&self.editor);
        self.doc
            .save(&self.path)
            .with_context(|| format!("Failed to save {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "Saved edit document");
        Ok(())
    }
}

/// Fail while another process is exporting the document at `path`.
pub fn ensure_not_exporting(path: &Path) -> anyhow::Result<()> {
    let gate = ExportGate::for_document(path);
    if gate.is_exporting() {
        let lock = gate.lock_path().unwrap_or(path);
        anyhow::bail!(
            "An export of this edit is running (lock file {}); try again when it finishes",
            lock.display()
        );
    }
    Ok(())
}

/// Parse four comma-separated normalized values.
pub fn parse_quad(text: &str) -> anyhow::Result<[f64; 4]> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid coordinates '{text}'"))?;
    let quad: [f64; 4] = values
        .try_into()
        .map_err(|v: Vec<f64>| anyhow::anyhow!("Expected 4 values, got {}", v.len()))?;
    if quad.iter().any(|v| !(0.0..=1.0).contains(v)) {
        anyhow::bail!("Coordinates must be between 0 and 1: '{text}'");
    }
    Ok(quad)
}

pub fn parse_crop(text: &str) -> anyhow::Result<CropRect> {
    let [l, t, r, b] = parse_quad(text)?;
    Ok(CropRect::new(l, t, r, b))
}

pub fn parse_mode(text: &str) -> anyhow::Result<FilterMode> {
    text.parse::<FilterMode>().map_err(anyhow::Error::msg)
}

/// `m:ss.mmm` for a millisecond position.
pub fn format_ms(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.unsigned_abs();
    format!("{sign}{}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

/// Print the segment list the way `info` shows it.
pub fn print_segments(editor: &Editor) {
    let selected = editor.selection();
    for (i, seg) in editor.segments().iter().enumerate() {
        let mut flags = Vec::new();
        if seg.muted {
            flags.push("muted".to_string());
        } else if (seg.volume - 1.0).abs() > f32::EPSILON {
            flags.push(format!("volume {:.2}", seg.volume));
        }
        if selected.contains(&i) {
            flags.push("selected".to_string());
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!(
            "  [{i}] {} - {}  {}{flags}",
            format_ms(seg.start_ms),
            format_ms(seg.end_ms),
            format_ms(seg.duration_ms()),
        );
    }
    println!(
        "  Total: {} of {}",
        format_ms(editor.timeline().total_edited_duration_ms()),
        format_ms(editor.timeline().duration_ms())
    );
}
