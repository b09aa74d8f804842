//! The editing session: one owner for timeline, history and regions.
//!
//! Every destructive timeline edit captures a snapshot first and records
//! it only when the edit changed something.

use std::collections::BTreeSet;

use cliptrim_common::{ClipResult, EditingConfig};

use crate::history::{HistorySnapshot, HistoryStack};
use crate::region::RegionSet;
use crate::segment::{validate_segments, Edge, Segment, SegmentTimeline, TimelineLimits};

/// Selected audio stream and how many the source offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrackSelection {
    pub index: usize,
    pub count: usize,
}

impl Default for AudioTrackSelection {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

/// Single logical owner of all mutable edit state.
#[derive(Debug, Clone)]
pub struct Editor {
    config: EditingConfig,
    timeline: SegmentTimeline,
    history: HistoryStack,
    regions: RegionSet,
    selection: BTreeSet<usize>,
    playhead_ms: i64,
    audio_track: AudioTrackSelection,
}

impl Editor {
    pub fn new(config: EditingConfig) -> Self {
        Self {
            timeline: SegmentTimeline::new(TimelineLimits::from(&config)),
            history: HistoryStack::new(config.history_capacity),
            regions: RegionSet::default(),
            selection: BTreeSet::new(),
            playhead_ms: 0,
            audio_track: AudioTrackSelection::default(),
            config,
        }
    }

    /// Rebuild an editor from persisted parts.
    ///
    /// Every stored history snapshot must fit the media; the history is
    /// resized to the configured capacity.
    pub fn restore(
        config: EditingConfig,
        duration_ms: i64,
        segments: Vec<Segment>,
        mut history: HistoryStack,
        regions: RegionSet,
        playhead_ms: i64,
        audio_track: AudioTrackSelection,
    ) -> ClipResult<Self> {
        let mut editor = Self::new(config);
        if editor.timeline.initialize(duration_ms) {
            editor.timeline.replace_all(segments)?;
        }
        for snapshot in history.snapshots() {
            validate_segments(snapshot.segments(), duration_ms)?;
        }
        history.set_capacity(editor.config.history_capacity);
        editor.history = history;
        editor.regions = regions;
        editor.audio_track = audio_track;
        editor.playhead_ms = editor.timeline.clamp_playhead(playhead_ms);
        Ok(editor)
    }

    /// Reset all state for a newly opened source.
    pub fn load_media(&mut self, duration_ms: i64, audio_track_count: usize) {
        self.history.clear();
        self.selection.clear();
        self.regions = RegionSet::default();
        self.playhead_ms = 0;
        self.audio_track = AudioTrackSelection {
            index: 0,
            count: audio_track_count.max(1),
        };
        self.timeline.clear();
        self.timeline.initialize(duration_ms);
        tracing::info!(
            duration_ms,
            audio_tracks = self.audio_track.count,
            "Loaded media"
        );
    }

    pub fn config(&self) -> &EditingConfig {
        &self.config
    }

    pub fn timeline(&self) -> &SegmentTimeline {
        &self.timeline
    }

    pub fn segments(&self) -> &[Segment] {
        self.timeline.segments()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Crop and filter regions are not part of undo history.
    pub fn regions_mut(&mut self) -> &mut RegionSet {
        &mut self.regions
    }

    pub fn playhead_ms(&self) -> i64 {
        self.playhead_ms
    }

    pub fn audio_track(&self) -> AudioTrackSelection {
        self.audio_track
    }

    pub fn selection(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::new(self.timeline.segments())
    }

    /// Run a timeline edit, recording history only if it changed state.
    fn edit<T>(
        &mut self,
        op: impl FnOnce(&mut SegmentTimeline) -> T,
        applied: impl FnOnce(&T) -> bool,
    ) -> T {
        let before = self.snapshot();
        let result = op(&mut self.timeline);
        if applied(&result) {
            self.history.save(before);
        }
        result
    }

    // -- Timeline edits --

    pub fn split_at(&mut self, position_ms: i64) -> Option<usize> {
        let result = self.edit(|t| t.split_at(position_ms), Option::is_some);
        if result.is_some() {
            self.selection.clear();
        }
        result
    }

    pub fn split_at_playhead(&mut self) -> Option<usize> {
        self.split_at(self.playhead_ms)
    }

    pub fn delete_segments(&mut self, indices: &[usize]) -> usize {
        let removed = self.edit(|t| t.delete_segments(indices), |n| *n > 0);
        if removed > 0 {
            self.selection.clear();
            self.playhead_ms = self.timeline.clamp_playhead(self.playhead_ms);
        }
        removed
    }

    pub fn delete_selected(&mut self) -> usize {
        let indices = self.selection();
        self.delete_segments(&indices)
    }

    pub fn resize_boundary(&mut self, index: usize, edge: Edge, new_time_ms: i64) -> bool {
        let applied = self.edit(|t| t.resize_boundary(index, edge, new_time_ms), |ok| *ok);
        if applied {
            self.playhead_ms = self.timeline.clamp_playhead(self.playhead_ms);
        }
        applied
    }

    /// Replace the timeline with auto-cut output. Failures leave both the
    /// timeline and history untouched.
    pub fn apply_segments(&mut self, segments: Vec<Segment>) -> ClipResult<()> {
        let before = self.snapshot();
        self.timeline.replace_all(segments)?;
        self.history.save(before);
        self.selection.clear();
        self.playhead_ms = self.timeline.clamp_playhead(self.playhead_ms);
        Ok(())
    }

    pub fn set_muted(&mut self, indices: &[usize], muted: bool) -> usize {
        self.edit(|t| t.set_muted(indices, muted), |n| *n > 0)
    }

    pub fn toggle_muted(&mut self, indices: &[usize]) -> usize {
        self.edit(|t| t.toggle_muted(indices), |n| *n > 0)
    }

    pub fn set_volume(&mut self, indices: &[usize], volume: f32) -> usize {
        self.edit(|t| t.set_volume(indices, volume), |n| *n > 0)
    }

    // -- History --

    /// Step back one edit. A snapshot that no longer fits the timeline is
    /// left on the stack and nothing changes.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.peek_undo().cloned() else {
            return false;
        };
        let current = self.snapshot();
        if !self.apply_snapshot(previous) {
            return false;
        }
        self.history.undo(current);
        true
    }

    /// Step forward one undone edit, with the same guarantee as [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.peek_redo().cloned() else {
            return false;
        };
        let current = self.snapshot();
        if !self.apply_snapshot(next) {
            return false;
        }
        self.history.redo(current);
        true
    }

    fn apply_snapshot(&mut self, snapshot: HistorySnapshot) -> bool {
        if let Err(e) = self.timeline.replace_all(snapshot.into_segments()) {
            tracing::warn!(error = %e, "History snapshot does not fit the timeline");
            return false;
        }
        self.selection.clear();
        self.playhead_ms = self.timeline.clamp_playhead(self.playhead_ms);
        true
    }

    // -- Selection and playhead --

    /// Select a segment. Non-additive selection replaces the current one;
    /// additive selection toggles membership.
    pub fn select(&mut self, index: usize, additive: bool) -> bool {
        if index >= self.timeline.len() {
            return false;
        }
        if !additive {
            self.selection.clear();
            self.selection.insert(index);
        } else if !self.selection.remove(&index) {
            self.selection.insert(index);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Move the playhead, keeping it inside the media and out of gaps.
    pub fn set_playhead(&mut self, position_ms: i64) -> i64 {
        let bounded = position_ms.clamp(0, self.timeline.duration_ms().max(0));
        self.playhead_ms = self.timeline.clamp_playhead(bounded);
        self.playhead_ms
    }

    /// Step the playhead by the coarse or fine increment.
    pub fn nudge_playhead(&mut self, forward: bool, fine: bool) -> i64 {
        let step = if fine {
            self.config.fine_step_ms
        } else {
            self.config.nudge_ms
        };
        let target = if forward {
            (self.playhead_ms + step).min(self.timeline.end_limit())
        } else {
            (self.playhead_ms - step).max(self.timeline.start_limit())
        };
        self.set_playhead(target)
    }

    // -- Audio tracks --

    /// Advance to the next audio stream, wrapping around.
    pub fn cycle_audio_track(&mut self) -> usize {
        let count = self.audio_track.count.max(1);
        self.audio_track.index = (self.audio_track.index + 1) % count;
        self.audio_track.index
    }

    pub fn select_audio_track(&mut self, index: usize) -> bool {
        if index >= self.audio_track.count {
            return false;
        }
        self.audio_track.index = index;
        true
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditingConfig::default())
    }
}
