//! cliptrim Processing Core
//!
//! Derives editing decisions from analysis data:
//! - **Auto-Cut:** Re-segment a timeline around detected silences
//!
//! This crate is pure computation: no I/O, no process spawning.
//! All inputs are data; all outputs are data.

pub mod silence;

pub use silence::{parse_silence_markers, SilenceMarkers, SilenceOutcome, SilenceSegmenter};
