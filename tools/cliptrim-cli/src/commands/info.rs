//! Show the current edit.

use std::path::PathBuf;

use cliptrim_common::AppConfig;

use super::{format_ms, print_segments, Session};

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let session = Session::open(config, &path)?;
    let doc = &session.doc;
    let editor = &session.editor;

    println!("Source: {}", doc.media.path.display());
    println!("  Document: {}", session.path.display());
    println!("  Duration: {}", format_ms(doc.media.duration_ms));
    println!("  Resolution: {}x{}", doc.media.width, doc.media.height);
    println!("  Size: {:.1} MiB", doc.media.file_size as f64 / (1024.0 * 1024.0));
    if doc.has_audio {
        let track = editor.audio_track();
        println!("  Audio track: {} of {}", track.index + 1, track.count);
    } else {
        println!("  Audio: none");
    }
    if let Some(name) = &doc.custom_name {
        println!("  Export name: {name}");
    }
    println!();

    println!("Segments:");
    print_segments(editor);
    println!("  Playhead: {}", format_ms(editor.playhead_ms()));
    println!();

    let regions = editor.regions();
    println!("Frame:");
    let crop = regions.crop;
    if crop.is_full() {
        println!("  Crop: none");
    } else {
        println!(
            "  Crop: {:.3},{:.3} to {:.3},{:.3} ({:.0}% of frame)",
            crop.left,
            crop.top,
            crop.right,
            crop.bottom,
            crop.area() * 100.0
        );
    }
    println!("  Regions: {}", regions.regions.len());
    println!();

    let history = editor.history();
    println!("History:");
    println!(
        "  Undo: {} / {}  Redo: {}",
        history.undo_depth(),
        history.capacity(),
        history.redo_depth()
    );

    Ok(())
}
