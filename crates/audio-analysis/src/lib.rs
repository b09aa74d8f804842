//! cliptrim Media Analysis
//!
//! Thin async wrappers around the external tools that inspect a source:
//! - **Silence Detection:** `ffmpeg -af silencedetect`, parsed into markers
//! - **Probing:** `ffprobe` for duration, frame size and audio streams
//!
//! Failures to run a tool are reported once and never retried.

pub mod probe;
pub mod silence_detect;

pub use probe::*;
pub use silence_detect::*;
