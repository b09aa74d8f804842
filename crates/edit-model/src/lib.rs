//! cliptrim Edit Model
//!
//! Defines the editable state of a clip:
//! - **Segments:** Ordered, non-overlapping kept intervals of the source
//! - **History:** Bounded snapshot undo/redo over the segment list
//! - **Regions:** Crop rectangle and privacy-filter rectangles
//! - **Editor:** The single owner that ties the above together
//! - **Document:** JSON persistence of an editing session
//!
//! Region coordinates are normalized to `[0.0, 1.0]` relative to the
//! source frame; times are integer milliseconds.

pub mod document;
pub mod editor;
pub mod history;
pub mod region;
pub mod segment;

pub use document::*;
pub use editor::*;
pub use history::*;
pub use region::*;
pub use segment::*;
