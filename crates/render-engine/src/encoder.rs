//! H.264 encoder selection and parameter sets.

use std::process::Stdio;

use tokio::process::Command;

use crate::budget::RateControl;

/// Available H.264 encoders, hardware first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    /// NVIDIA NVENC (`h264_nvenc`).
    Nvenc,
    /// Software fallback (`libx264`).
    X264,
}

/// Preset family requested by an export mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeProfile {
    /// Quality-tuned, used for regular video exports.
    Quality,
    /// Fastest encode, used for muted exports.
    LowLatency,
}

impl EncoderKind {
    pub fn codec(&self) -> &'static str {
        match self {
            EncoderKind::Nvenc => "h264_nvenc",
            EncoderKind::X264 => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, EncoderKind::Nvenc)
    }

    /// Codec, preset and pixel format arguments.
    pub fn preset_args(&self, profile: EncodeProfile) -> Vec<String> {
        let preset: &[&str] = match (self, profile) {
            (EncoderKind::Nvenc, EncodeProfile::Quality) => &["-preset", "p4", "-tune", "hq"],
            (EncoderKind::Nvenc, EncodeProfile::LowLatency) => {
                &["-preset", "p1", "-tune", "ull", "-zerolatency", "1"]
            }
            (EncoderKind::X264, EncodeProfile::Quality) => &["-preset", "medium"],
            (EncoderKind::X264, EncodeProfile::LowLatency) => {
                &["-preset", "ultrafast", "-tune", "zerolatency"]
            }
        };

        let mut args = vec!["-c:v".to_string(), self.codec().to_string()];
        args.extend(preset.iter().map(|s| s.to_string()));
        args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
        args
    }

    /// Rate-control arguments in this encoder's dialect.
    pub fn rate_args(&self, rate: &RateControl) -> Vec<String> {
        match (self, rate) {
            (
                _,
                RateControl::TargetBitrate {
                    kbps,
                    maxrate_kbps,
                    bufsize_kbps,
                },
            ) => {
                let mut args = Vec::new();
                if self.is_hardware() {
                    args.extend(["-rc".to_string(), "vbr".to_string()]);
                }
                args.extend([
                    "-b:v".to_string(),
                    format!("{kbps}k"),
                    "-maxrate".to_string(),
                    format!("{maxrate_kbps}k"),
                    "-bufsize".to_string(),
                    format!("{bufsize_kbps}k"),
                ]);
                args
            }
            (EncoderKind::Nvenc, RateControl::ConstantQuality { quality }) => vec![
                "-rc".to_string(),
                "constqp".to_string(),
                "-qp".to_string(),
                quality.to_string(),
            ],
            (EncoderKind::X264, RateControl::ConstantQuality { quality }) => {
                vec!["-crf".to_string(), quality.to_string()]
            }
        }
    }
}

/// Arguments for a throwaway encode that only succeeds when `codec` works
/// on this machine (driver and GPU present, not just compiled in).
pub fn probe_args(codec: &str) -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "lavfi",
        "-i",
        "testsrc=duration=0.01:size=256x256:rate=1",
        "-c:v",
        codec,
        "-f",
        "null",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Pick the encoder for one export.
pub async fn select_encoder(ffmpeg: &str, prefer_hardware: bool) -> EncoderKind {
    if !prefer_hardware {
        return EncoderKind::X264;
    }

    let status = Command::new(ffmpeg)
        .args(probe_args(EncoderKind::Nvenc.codec()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            tracing::info!(encoder = EncoderKind::Nvenc.codec(), "Hardware encoder available");
            EncoderKind::Nvenc
        }
        Ok(status) => {
            tracing::info!(%status, "Hardware encoder unavailable, using libx264");
            EncoderKind::X264
        }
        Err(e) => {
            tracing::warn!(error = %e, "Encoder probe failed to start, using libx264");
            EncoderKind::X264
        }
    }
}
