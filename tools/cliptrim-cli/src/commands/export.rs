//! Export the edit.

use std::io::Write;
use std::path::PathBuf;

use cliptrim_common::AppConfig;
use cliptrim_render_engine::{
    default_output_path, export_clip, request_from_document, ExportGate, ExportMode,
    ExportProgress, ExportStage, ProgressCallback,
};

use super::{format_ms, ModeArg, Session};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    mode: ModeArg,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = Session::open(config, &path)?;
    let mode = ExportMode::from(mode);
    let settings = &config.export;

    let output_path = match output {
        Some(path) => path,
        None => default_output_path(&session.doc, mode, settings)?,
    };

    println!("Exporting: {}", session.doc.media.path.display());
    println!("  Mode: {mode:?}");
    println!(
        "  Length: {} in {} segment(s)",
        format_ms(session.editor.timeline().total_edited_duration_ms()),
        session.editor.segments().len()
    );
    println!("  Output: {}", output_path.display());

    let request = request_from_document(&session.doc, mode, settings, output_path.clone());

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        if p.stage == ExportStage::Encoding {
            print!("\r  Progress: {:>3}%", p.percent);
            let _ = std::io::stdout().flush();
        }
    });

    let gate = ExportGate::for_document(&session.path);
    match export_clip(request, settings, &gate, Some(progress_cb)).await {
        Ok(path) => {
            println!("\r  Progress: 100%");
            println!("Export complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::Error::new(e).context("Export failed"))
        }
    }
}
