//! Bitrate budgeting for size-targeted exports.

use serde::{Deserialize, Serialize};

pub const MIB: f64 = 1024.0 * 1024.0;

/// Quality used when a size target is unnecessary.
pub const CONSTANT_QUALITY: u8 = 23;

/// Shortest duration used in bitrate division, in seconds.
const MIN_DURATION_SECS: f64 = 0.1;

/// How the video encoder is asked to spend bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateControl {
    /// Average bitrate with a VBV ceiling.
    TargetBitrate {
        kbps: u32,
        maxrate_kbps: u32,
        bufsize_kbps: u32,
    },
    /// Fixed quantizer / CRF.
    ConstantQuality { quality: u8 },
}

impl RateControl {
    pub fn target(kbps: u32) -> Self {
        Self::TargetBitrate {
            kbps,
            maxrate_kbps: (kbps as f64 * 1.1).round() as u32,
            bufsize_kbps: kbps.saturating_mul(2),
        }
    }
}

/// Bounds applied to computed video bitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateBudgeter {
    pub min_kbps: u32,
    pub max_kbps: u32,
}

impl BitrateBudgeter {
    /// Bounds for regular video exports.
    pub const VIDEO: Self = Self {
        min_kbps: 200,
        max_kbps: 12_000,
    };

    /// Bounds for muted low-latency exports.
    pub const MUTED: Self = Self {
        min_kbps: 200,
        max_kbps: 10_000,
    };

    /// Video bitrate that lands the whole file near `target_bytes`.
    ///
    /// `audio_bps` is reserved out of the total before converting to kbps.
    pub fn video_kbps(&self, target_bytes: u64, duration_secs: f64, audio_bps: u32) -> u32 {
        let duration = if duration_secs.is_finite() {
            duration_secs.max(MIN_DURATION_SECS)
        } else {
            MIN_DURATION_SECS
        };
        let total_bps = target_bytes as f64 * 8.0 / duration;
        let kbps = ((total_bps - audio_bps as f64) / 1000.0).trunc();
        kbps.clamp(self.min_kbps as f64, self.max_kbps as f64) as u32
    }
}

/// Rough output size if the source bitrate were kept: scaled by the share
/// of time kept and the share of frame area kept.
pub fn estimate_output_bytes(
    original_size_bytes: u64,
    edited_ms: i64,
    original_ms: i64,
    crop_area_fraction: f64,
) -> f64 {
    if original_ms <= 0 {
        return original_size_bytes as f64;
    }
    let time_ratio = (edited_ms.max(0) as f64 / original_ms as f64).clamp(0.0, 1.0);
    original_size_bytes as f64 * time_ratio * crop_area_fraction.clamp(0.0, 1.0)
}

/// Pick rate control for a muted export: constant quality when the
/// estimate already fits under `threshold_bytes`, else a bitrate target.
pub fn muted_rate_control(
    estimated_bytes: f64,
    threshold_bytes: u64,
    target_bytes: u64,
    duration_secs: f64,
) -> RateControl {
    if estimated_bytes <= threshold_bytes as f64 {
        RateControl::ConstantQuality {
            quality: CONSTANT_QUALITY,
        }
    } else {
        RateControl::target(BitrateBudgeter::MUTED.video_kbps(target_bytes, duration_secs, 0))
    }
}

/// Convert MiB from configuration to bytes.
pub fn mib_to_bytes(mib: f64) -> u64 {
    (mib.max(0.0) * MIB) as u64
}
