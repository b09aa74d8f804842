//! Check ffmpeg, ffprobe and encoder availability.

use std::process::Stdio;

use tokio::process::Command;

use cliptrim_common::{config_file_path, AppConfig};
use cliptrim_render_engine::{output_dir_for, select_encoder};

async fn tool_version(program: &str) -> Option<String> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("cliptrim System Check");
    println!("{}", "=".repeat(50));

    let settings = &config.export;
    let mut all_ok = true;
    for program in [&settings.ffmpeg_path, &settings.ffprobe_path] {
        match tool_version(program).await {
            Some(version) => println!("[OK] {version}"),
            None => {
                println!("[MISSING] {program} could not be run");
                all_ok = false;
            }
        }
    }

    if all_ok {
        let encoder = select_encoder(&settings.ffmpeg_path, settings.prefer_hardware).await;
        let kind = if encoder.is_hardware() {
            "hardware"
        } else {
            "software"
        };
        println!("[OK] H.264 encoder: {} ({kind})", encoder.codec());
    }

    println!();
    println!("Config: {}", config_file_path().display());
    println!("Exports: {}", output_dir_for(settings).display());

    println!();
    if all_ok {
        println!("All required tools are available. cliptrim is ready.");
    } else {
        println!("ffmpeg and ffprobe are required. Install them or set their paths in the config.");
    }

    Ok(())
}
