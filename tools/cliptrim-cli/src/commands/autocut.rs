//! Silence-based auto-cut.

use std::path::PathBuf;

use anyhow::Context;

use cliptrim_audio_analysis::SilenceDetector;
use cliptrim_common::AppConfig;
use cliptrim_processing_core::{SilenceOutcome, SilenceSegmenter};

use super::{ensure_not_exporting, print_segments, Session};

pub async fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    ensure_not_exporting(&session.path)?;
    if !session.doc.has_audio {
        anyhow::bail!("Source has no audio to analyze");
    }

    let source = session.doc.media.path.clone();
    let track = session.editor.audio_track().index;
    println!(
        "Detecting silence in {} (audio track {})...",
        source.display(),
        track + 1
    );

    let detector = SilenceDetector::new(&config.export.ffmpeg_path, &config.silence);
    let markers = detector
        .detect(&source, track)
        .await
        .context("Silence detection failed; timeline left unchanged")?;

    let total_s = session.editor.timeline().duration_ms() as f64 / 1000.0;
    match SilenceSegmenter::from(&config.silence).segment(&markers, total_s) {
        SilenceOutcome::Segmented(segments) => {
            let count = segments.len();
            session.editor.apply_segments(segments)?;
            println!("Kept {count} span(s) around speech:");
            print_segments(&session.editor);
            session.save()
        }
        SilenceOutcome::NoSilenceFound => {
            println!("No silence found; timeline left unchanged.");
            Ok(())
        }
        SilenceOutcome::NoSpeechFound => {
            println!("Only silence found; timeline left unchanged.");
            Ok(())
        }
    }
}
