//! Audio track selection.

use std::path::PathBuf;

use cliptrim_common::AppConfig;

use super::Session;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    select: Option<usize>,
    cycle: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    if !session.doc.has_audio {
        println!("Source has no audio tracks");
        return Ok(());
    }

    let changed = match select {
        Some(index) => {
            if !session.editor.select_audio_track(index) {
                anyhow::bail!(
                    "Track {index} does not exist ({} available)",
                    session.editor.audio_track().count
                );
            }
            true
        }
        None if cycle => {
            session.editor.cycle_audio_track();
            true
        }
        None => false,
    };

    let track = session.editor.audio_track();
    for i in 0..track.count {
        let marker = if i == track.index { "*" } else { " " };
        println!("  {marker} track {i}");
    }

    if changed {
        session.save()?;
    }
    Ok(())
}
