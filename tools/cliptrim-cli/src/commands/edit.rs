//! Timeline edits: split, delete, resize, mute, volume, undo/redo, seek.
//!
//! Each command loads the document, applies one edit through the editor and
//! saves it back. Edits that do nothing leave the document untouched.

use std::path::PathBuf;

use cliptrim_common::AppConfig;
use cliptrim_edit_model::MAX_VOLUME;

use super::{format_ms, print_segments, EdgeArg, Session};

fn finish(session: Session, changed: bool, message: &str) -> anyhow::Result<()> {
    if !changed {
        println!("{message}");
        return Ok(());
    }
    print_segments(&session.editor);
    session.save()
}

pub fn split(config: &AppConfig, path: PathBuf, at: Option<i64>) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let position = at.unwrap_or_else(|| session.editor.playhead_ms());
    let result = session.editor.split_at(position);
    if let Some(index) = result {
        println!("Split at {} (new segment {index})", format_ms(position));
    }
    finish(
        session,
        result.is_some(),
        "Nothing to split: position is outside a segment or too close to an edge.",
    )
}

pub fn delete(config: &AppConfig, path: PathBuf, indices: Vec<usize>) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let removed = session.editor.delete_segments(&indices);
    if removed > 0 {
        println!("Deleted {removed} segment(s)");
    }
    finish(
        session,
        removed > 0,
        "Nothing deleted: indices are out of range or would remove every segment.",
    )
}

pub fn resize(
    config: &AppConfig,
    path: PathBuf,
    index: usize,
    edge: EdgeArg,
    time_ms: i64,
) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let applied = session
        .editor
        .resize_boundary(index, edge.into(), time_ms);
    finish(
        session,
        applied,
        "Nothing resized: no room to move that edge.",
    )
}

pub fn undo(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let applied = session.editor.undo();
    finish(session, applied, "Nothing to undo.")
}

pub fn redo(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let applied = session.editor.redo();
    finish(session, applied, "Nothing to redo.")
}

pub fn mute(
    config: &AppConfig,
    path: PathBuf,
    indices: Vec<usize>,
    off: bool,
    toggle: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let changed = if toggle {
        session.editor.toggle_muted(&indices)
    } else {
        session.editor.set_muted(&indices, !off)
    };
    finish(session, changed > 0, "No segments changed.")
}

pub fn volume(
    config: &AppConfig,
    path: PathBuf,
    indices: Vec<usize>,
    level: f32,
) -> anyhow::Result<()> {
    if !level.is_finite() || level < 0.0 {
        anyhow::bail!("Volume must be a non-negative number");
    }
    if level > MAX_VOLUME {
        println!("Volume capped at {MAX_VOLUME}");
    }
    let mut session = Session::open(config, &path)?;
    let changed = session.editor.set_volume(&indices, level);
    finish(session, changed > 0, "No segments changed.")
}

pub fn seek(
    config: &AppConfig,
    path: PathBuf,
    to: Option<i64>,
    forward: bool,
    back: bool,
    fine: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let position = match to {
        Some(ms) => session.editor.set_playhead(ms),
        None if forward || back => session.editor.nudge_playhead(forward, fine),
        None => session.editor.playhead_ms(),
    };
    println!("Playhead: {}", format_ms(position));
    session.save()
}

pub fn name(config: &AppConfig, path: PathBuf, name: Option<String>) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if let Some(n) = &name {
        if n.contains(['/', '\\']) {
            anyhow::bail!("Export name must not contain path separators");
        }
    }
    match &name {
        Some(n) => println!("Export name: {n}"),
        None => println!("Export name cleared"),
    }
    session.doc.custom_name = name;
    session.save()
}
