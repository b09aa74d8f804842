//! cliptrim Render Engine
//!
//! Turns an edit (segments, crop, filter regions) into a single ffmpeg
//! invocation and runs it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! segments ────┐
//!              ├── ExportCompiler ── FilterGraph + encode args
//! regions ─────┘         │
//!                        ├── BitrateBudgeter (size-targeted modes)
//! encoder probe ─────────┘         │
//!                                  ▼
//!                           ExportPlan (args)
//!                                  │
//!                    ffmpeg -progress pipe:1 ── ProgressTracker
//!                                  │
//!                                  ▼
//!                          clip.mp4 / .mp3 / .gif
//! ```
//!
//! Only one export runs at a time; see [`ExportGate`].

pub mod budget;
pub mod compiler;
pub mod encoder;
pub mod export;
pub mod graph;
pub mod progress;

pub use budget::{BitrateBudgeter, RateControl};
pub use compiler::{ExportCompiler, ExportMode, ExportPlan, ExportRequest};
pub use encoder::{select_encoder, EncodeProfile, EncoderKind};
pub use export::*;
pub use graph::{Filter, FilterChain, FilterGraph};
pub use progress::{ExportOutcome, ProgressTracker};
