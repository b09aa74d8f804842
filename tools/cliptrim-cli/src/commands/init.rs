//! Probe a source and create its edit document.

use std::path::PathBuf;

use anyhow::Context;

use cliptrim_audio_analysis::MediaProbe;
use cliptrim_common::AppConfig;
use cliptrim_edit_model::EditDocument;

use super::{document_path, format_ms};

pub async fn run(config: &AppConfig, source: PathBuf, force: bool) -> anyhow::Result<()> {
    let doc_path = document_path(&source);
    if doc_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to start over)",
            doc_path.display()
        );
    }

    println!("Probing: {}", source.display());
    let probe = MediaProbe::new(&config.export.ffprobe_path);
    let probed = probe
        .probe(&source)
        .await
        .with_context(|| format!("Failed to probe {}", source.display()))?;

    let media = probed.info.clone();
    let doc = EditDocument::new(probed.info, probed.has_audio, &config.editing);
    doc.save(&doc_path)
        .with_context(|| format!("Failed to write {}", doc_path.display()))?;

    println!("Document created: {}", doc_path.display());
    println!("  Duration: {}", format_ms(media.duration_ms));
    if media.width > 0 {
        println!("  Resolution: {}x{}", media.width, media.height);
    }
    println!(
        "  Audio: {}",
        if probed.has_audio {
            format!("{} track(s)", media.audio_tracks)
        } else {
            "none".to_string()
        }
    );

    Ok(())
}
