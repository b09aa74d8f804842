//! Print the ffmpeg command an export would run, without running it.

use std::path::PathBuf;

use cliptrim_common::AppConfig;
use chrono::Local;

use cliptrim_render_engine::{
    compiler_for, output_dir_for, output_path_in, request_from_document, select_encoder,
    EncoderKind, ExportMode, RateControl,
};

use super::{format_ms, ModeArg, Session};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    mode: ModeArg,
    probe_encoder: bool,
) -> anyhow::Result<()> {
    let session = Session::open(config, &path)?;
    let mode = ExportMode::from(mode);
    let settings = &config.export;

    let encoder = if probe_encoder {
        select_encoder(&settings.ffmpeg_path, settings.prefer_hardware).await
    } else {
        EncoderKind::X264
    };
    let output = output_path_in(&output_dir_for(settings), &session.doc, mode, Local::now());
    let request = request_from_document(&session.doc, mode, settings, output);
    let plan = compiler_for(settings, encoder).compile(&request)?;

    println!("Mode: {mode:?}");
    println!("  Encoder: {}", plan.encoder.codec());
    println!("  Seek origin: {}", format_ms(plan.seek_origin_ms));
    println!("  Output length: {}", format_ms(plan.expected_duration_ms));
    match plan.rate_control {
        Some(RateControl::TargetBitrate { kbps, .. }) => println!("  Video bitrate: {kbps} kbps"),
        Some(RateControl::ConstantQuality { quality }) => {
            println!("  Constant quality: {quality}")
        }
        None => {}
    }
    println!("  Output: {}", plan.output_path.display());
    println!();

    println!("Filter graph:");
    for chain in plan.graph.chains() {
        println!("  {chain}");
    }
    println!();

    println!("Command:");
    let quoted: Vec<String> = plan.args.iter().map(|a| shell_quote(a)).collect();
    println!("  {} {}", settings.ffmpeg_path, quoted.join(" "));

    Ok(())
}

fn shell_quote(arg: &str) -> String {
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:+=,".contains(c));
    if plain && !arg.is_empty() {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
