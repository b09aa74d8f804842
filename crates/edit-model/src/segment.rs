//! Segment timeline: the ordered list of kept intervals over a media source.
//!
//! All times are integer milliseconds on the source's own clock. The list is
//! kept sorted by start, pairwise non-overlapping, and inside
//! `[0, duration_ms]`. It is empty only before a positive duration is known.

use serde::{Deserialize, Serialize};

use cliptrim_common::{ClipError, ClipResult, EditingConfig};

/// Upper bound for per-segment gain.
pub const MAX_VOLUME: f32 = 5.0;

/// A kept interval of the source media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_ms: i64,
    pub end_ms: i64,

    /// Linear gain, `1.0` is unchanged.
    #[serde(default = "unity")]
    pub volume: f32,

    /// Playback pitch factor. Stored, not rendered by export.
    #[serde(default = "unity")]
    pub pitch: f32,

    #[serde(default)]
    pub muted: bool,
}

fn unity() -> f32 {
    1.0
}

impl Segment {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms,
            end_ms,
            volume: 1.0,
            pitch: 1.0,
            muted: false,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, position_ms: i64) -> bool {
        position_ms >= self.start_ms && position_ms < self.end_ms
    }

    /// Whether the audio of this segment renders unchanged.
    pub fn has_neutral_audio(&self) -> bool {
        !self.muted && (self.volume - 1.0).abs() < f32::EPSILON
    }
}

/// Which boundary of a segment a resize moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Start,
    End,
}

/// Edit limits applied by the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineLimits {
    pub split_margin_ms: i64,
    pub min_segment_ms: i64,
}

impl Default for TimelineLimits {
    fn default() -> Self {
        Self {
            split_margin_ms: 200,
            min_segment_ms: 100,
        }
    }
}

impl From<&EditingConfig> for TimelineLimits {
    fn from(config: &EditingConfig) -> Self {
        Self {
            split_margin_ms: config.split_margin_ms,
            min_segment_ms: config.min_segment_ms,
        }
    }
}

/// Ordered, non-overlapping segments over a media duration.
///
/// Mutations that cannot be applied are silent no-ops and report `false`
/// (or `None`/`0`). The timeline keeps no history of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTimeline {
    duration_ms: i64,
    segments: Vec<Segment>,
    limits: TimelineLimits,
}

impl Default for SegmentTimeline {
    fn default() -> Self {
        Self::new(TimelineLimits::default())
    }
}

impl SegmentTimeline {
    /// An empty timeline awaiting a media duration.
    pub fn new(limits: TimelineLimits) -> Self {
        Self {
            duration_ms: 0,
            segments: Vec::new(),
            limits,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn limits(&self) -> TimelineLimits {
        self.limits
    }

    /// Reset to a single segment covering `[0, duration_ms]`.
    ///
    /// A non-positive duration means the media is still loading; the list
    /// is left untouched and `false` is returned.
    pub fn initialize(&mut self, duration_ms: i64) -> bool {
        if duration_ms <= 0 {
            tracing::debug!(duration_ms, "Deferring timeline initialization");
            return false;
        }
        self.duration_ms = duration_ms;
        self.segments = vec![Segment::new(0, duration_ms)];
        true
    }

    /// Drop all segments and forget the duration.
    pub fn clear(&mut self) {
        self.duration_ms = 0;
        self.segments.clear();
    }

    /// Split the segment containing `position_ms`, returning the index of
    /// the new right-hand segment.
    ///
    /// The position must lie strictly further than the split margin from
    /// both boundaries of its segment.
    pub fn split_at(&mut self, position_ms: i64) -> Option<usize> {
        let margin = self.limits.split_margin_ms;
        let index = self.segments.iter().position(|s| {
            position_ms > s.start_ms + margin && position_ms < s.end_ms - margin
        })?;

        let left = &mut self.segments[index];
        let mut right = *left;
        right.start_ms = position_ms;
        left.end_ms = position_ms;

        self.segments.insert(index + 1, right);
        tracing::debug!(position_ms, index, "Split segment");
        Some(index + 1)
    }

    /// Remove one segment. See [`Self::delete_segments`].
    pub fn delete_segment(&mut self, index: usize) -> bool {
        self.delete_segments(&[index]) == 1
    }

    /// Remove the segments at `indices`, returning how many were removed.
    ///
    /// Out-of-range and duplicate indices are ignored. A deletion that would
    /// leave the timeline empty is rejected as a whole.
    pub fn delete_segments(&mut self, indices: &[usize]) -> usize {
        let mut targets: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.segments.len())
            .collect();
        targets.sort_unstable_by(|a, b| b.cmp(a));
        targets.dedup();

        if targets.is_empty() {
            return 0;
        }
        if targets.len() >= self.segments.len() {
            tracing::debug!(
                requested = targets.len(),
                "Refusing to delete every segment"
            );
            return 0;
        }

        for &i in &targets {
            self.segments.remove(i);
        }
        targets.len()
    }

    /// Move one edge of a segment, clamped so the segment keeps the minimum
    /// length and does not cross its neighbours or the media bounds.
    pub fn resize_boundary(&mut self, index: usize, edge: Edge, new_time_ms: i64) -> bool {
        let Some(segment) = self.segments.get(index).copied() else {
            return false;
        };
        let min_len = self.limits.min_segment_ms;
        let target = new_time_ms.clamp(0, self.duration_ms.max(0));

        let (lo, hi) = match edge {
            Edge::Start => {
                let lo = if index > 0 {
                    self.segments[index - 1].end_ms
                } else {
                    0
                };
                (lo, segment.end_ms - min_len)
            }
            Edge::End => {
                let hi = self
                    .segments
                    .get(index + 1)
                    .map(|next| next.start_ms)
                    .unwrap_or(self.duration_ms);
                (segment.start_ms + min_len, hi)
            }
        };
        if lo > hi {
            return false;
        }

        let value = target.clamp(lo, hi);
        let slot = &mut self.segments[index];
        let current = match edge {
            Edge::Start => &mut slot.start_ms,
            Edge::End => &mut slot.end_ms,
        };
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    /// Sum of all kept durations.
    pub fn total_edited_duration_ms(&self) -> i64 {
        self.segments.iter().map(Segment::duration_ms).sum()
    }

    /// Earliest playable position.
    pub fn start_limit(&self) -> i64 {
        self.segments.first().map(|s| s.start_ms).unwrap_or(0)
    }

    /// Latest playable position.
    pub fn end_limit(&self) -> i64 {
        self.segments
            .last()
            .map(|s| s.end_ms)
            .unwrap_or(self.duration_ms)
    }

    /// Replace the whole list, e.g. from auto-cut or a history snapshot.
    pub fn replace_all(&mut self, segments: Vec<Segment>) -> ClipResult<()> {
        validate_segments(&segments, self.duration_ms)?;
        self.segments = segments;
        Ok(())
    }

    /// Index of the segment containing `position_ms`.
    pub fn segment_index_at(&self, position_ms: i64) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(position_ms))
    }

    /// Snap a playhead that fell into a removed gap.
    ///
    /// Positions inside a segment (end inclusive) are returned unchanged.
    /// Otherwise the
    /// playhead jumps to the next segment's start, or wraps to the first
    /// segment when nothing follows.
    pub fn clamp_playhead(&self, position_ms: i64) -> i64 {
        if self.segments.is_empty() {
            return position_ms.clamp(0, self.duration_ms.max(0));
        }
        let inside = self
            .segments
            .iter()
            .any(|s| position_ms >= s.start_ms && position_ms <= s.end_ms);
        if inside {
            return position_ms;
        }
        self.segments
            .iter()
            .find(|s| s.start_ms > position_ms)
            .unwrap_or(&self.segments[0])
            .start_ms
    }

    /// Set the mute flag on the given segments.
    pub fn set_muted(&mut self, indices: &[usize], muted: bool) -> usize {
        self.update_each(indices, |s| {
            let changed = s.muted != muted;
            s.muted = muted;
            changed
        })
    }

    /// Flip the mute flag on the given segments.
    pub fn toggle_muted(&mut self, indices: &[usize]) -> usize {
        self.update_each(indices, |s| {
            s.muted = !s.muted;
            true
        })
    }

    /// Set linear gain on the given segments, clamped to `[0, MAX_VOLUME]`.
    pub fn set_volume(&mut self, indices: &[usize], volume: f32) -> usize {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, MAX_VOLUME)
        } else {
            1.0
        };
        self.update_each(indices, |s| {
            let changed = (s.volume - volume).abs() > f32::EPSILON;
            s.volume = volume;
            changed
        })
    }

    fn update_each(&mut self, indices: &[usize], mut f: impl FnMut(&mut Segment) -> bool) -> usize {
        let mut seen = indices.to_vec();
        seen.sort_unstable();
        seen.dedup();

        let mut changed = 0;
        for i in seen {
            if let Some(segment) = self.segments.get_mut(i) {
                if f(segment) {
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// Check ordering, bounds and non-overlap for a candidate segment list.
pub fn validate_segments(segments: &[Segment], duration_ms: i64) -> ClipResult<()> {
    for (i, s) in segments.iter().enumerate() {
        if s.start_ms < 0 || s.start_ms >= s.end_ms {
            return Err(ClipError::boundary(format!(
                "segment {i} has invalid bounds [{}, {}]",
                s.start_ms, s.end_ms
            )));
        }
        if duration_ms > 0 && s.end_ms > duration_ms {
            return Err(ClipError::boundary(format!(
                "segment {i} ends at {} past media duration {duration_ms}",
                s.end_ms
            )));
        }
        if !s.volume.is_finite() || !s.pitch.is_finite() {
            return Err(ClipError::boundary(format!(
                "segment {i} has non-finite audio settings (volume {}, pitch {})",
                s.volume, s.pitch
            )));
        }
    }
    if let Some(i) = segments
        .windows(2)
        .position(|pair| pair[0].end_ms > pair[1].start_ms)
    {
        return Err(ClipError::boundary(format!(
            "segments {i} and {} overlap or are out of order",
            i + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(duration_ms: i64) -> SegmentTimeline {
        let mut t = SegmentTimeline::default();
        assert!(t.initialize(duration_ms));
        t
    }

    fn bounds(t: &SegmentTimeline) -> Vec<(i64, i64)> {
        t.segments().iter().map(|s| (s.start_ms, s.end_ms)).collect()
    }

    #[test]
    fn test_initialize_single_segment() {
        let t = timeline(10_000);
        assert_eq!(bounds(&t), vec![(0, 10_000)]);
        assert_eq!(t.total_edited_duration_ms(), 10_000);
    }

    #[test]
    fn test_initialize_defers_non_positive_duration() {
        let mut t = SegmentTimeline::default();
        assert!(!t.initialize(0));
        assert!(!t.initialize(-5));
        assert!(t.is_empty());
        assert_eq!(t.start_limit(), 0);
        assert_eq!(t.end_limit(), 0);
    }

    #[test]
    fn test_split_in_middle() {
        let mut t = timeline(10_000);
        assert_eq!(t.split_at(5_000), Some(1));
        assert_eq!(bounds(&t), vec![(0, 5_000), (5_000, 10_000)]);
    }

    #[test]
    fn test_split_inherits_audio_state() {
        let mut t = timeline(10_000);
        t.set_volume(&[0], 2.0);
        t.set_muted(&[0], true);
        t.split_at(4_000);
        assert!(t.segments().iter().all(|s| s.muted && s.volume == 2.0));
    }

    #[test]
    fn test_split_within_margin_is_noop() {
        let mut t = timeline(10_000);
        assert_eq!(t.split_at(150), None);
        assert_eq!(t.split_at(9_900), None);
        // exactly on the margin counts as inside it
        assert_eq!(t.split_at(200), None);
        assert_eq!(t.split_at(9_800), None);
        assert_eq!(bounds(&t), vec![(0, 10_000)]);
    }

    #[test]
    fn test_split_in_gap_is_noop() {
        let mut t = timeline(10_000);
        t.split_at(3_000);
        t.split_at(6_000);
        assert!(t.delete_segment(1));
        assert_eq!(t.split_at(4_500), None);
    }

    #[test]
    fn test_delete_multiple_highest_first() {
        let mut t = timeline(10_000);
        t.split_at(2_000);
        t.split_at(4_000);
        t.split_at(6_000);
        assert_eq!(t.delete_segments(&[1, 3, 3, 42]), 2);
        assert_eq!(bounds(&t), vec![(0, 2_000), (4_000, 6_000)]);
    }

    #[test]
    fn test_delete_every_segment_rejected() {
        let mut t = timeline(10_000);
        t.split_at(5_000);
        assert_eq!(t.delete_segments(&[0, 1]), 0);
        assert_eq!(t.len(), 2);
        assert!(!timeline(1_000).delete_segment(0));
    }

    #[test]
    fn test_resize_end_clamps_to_next_start() {
        let mut t = timeline(10_000);
        t.split_at(5_000);
        t.delete_segments(&[1]);
        t.split_at(2_500);
        // [0,2500] [2500,5000]; shrink first then try to grow past neighbour
        assert!(t.resize_boundary(0, Edge::End, 1_000));
        assert!(t.resize_boundary(0, Edge::End, 9_000));
        assert_eq!(t.segments()[0].end_ms, 2_500);
    }

    #[test]
    fn test_resize_respects_min_length() {
        let mut t = timeline(10_000);
        assert!(t.resize_boundary(0, Edge::Start, 9_990));
        assert_eq!(t.segments()[0].start_ms, 9_900);
        // end is pinned: start + min length already equals the duration
        assert!(!t.resize_boundary(0, Edge::End, 0));
        assert_eq!(t.segments()[0].end_ms, 10_000);
    }

    #[test]
    fn test_resize_clamps_to_media_bounds() {
        let mut t = timeline(10_000);
        t.resize_boundary(0, Edge::Start, 1_000);
        assert!(t.resize_boundary(0, Edge::Start, -500));
        assert_eq!(t.segments()[0].start_ms, 0);
        assert!(!t.resize_boundary(0, Edge::End, 20_000));
        assert!(!t.resize_boundary(7, Edge::End, 1_000));
    }

    #[test]
    fn test_resize_rejects_when_no_room() {
        let mut t = timeline(10_000);
        t.split_at(5_000);
        t.resize_boundary(1, Edge::End, 5_050);
        // second segment is now 5000..5100, exactly min length
        assert_eq!(t.segments()[1].end_ms, 5_100);
        assert!(!t.resize_boundary(1, Edge::Start, 5_080));
    }

    #[test]
    fn test_limits_follow_segments() {
        let mut t = timeline(10_000);
        t.split_at(1_000);
        t.split_at(9_000);
        t.delete_segments(&[0, 2]);
        assert_eq!(t.start_limit(), 1_000);
        assert_eq!(t.end_limit(), 9_000);
        assert_eq!(t.total_edited_duration_ms(), 8_000);
    }

    #[test]
    fn test_replace_all_rejects_overlap() {
        let mut t = timeline(10_000);
        let err = t
            .replace_all(vec![Segment::new(0, 3_000), Segment::new(2_000, 4_000)])
            .unwrap_err();
        assert!(matches!(err, ClipError::BoundaryViolation { .. }));
        assert_eq!(bounds(&t), vec![(0, 10_000)]);
    }

    #[test]
    fn test_replace_all_rejects_out_of_bounds() {
        let mut t = timeline(10_000);
        assert!(t.replace_all(vec![Segment::new(0, 12_000)]).is_err());
        assert!(t.replace_all(vec![Segment::new(500, 500)]).is_err());
    }

    #[test]
    fn test_replace_all_rejects_non_finite_audio() {
        let mut t = timeline(10_000);
        let mut bad = Segment::new(0, 5_000);
        bad.volume = f32::NAN;
        assert!(t.replace_all(vec![bad]).is_err());

        bad.volume = 1.0;
        bad.pitch = f32::INFINITY;
        assert!(validate_segments(&[bad], 10_000).is_err());
        assert_eq!(bounds(&t), vec![(0, 10_000)]);
    }

    #[test]
    fn test_clamp_playhead_snaps_forward_then_wraps() {
        let mut t = timeline(10_000);
        t.split_at(3_000);
        t.split_at(6_000);
        t.delete_segments(&[0, 2]);
        // only [3000, 6000] remains
        assert_eq!(t.clamp_playhead(4_000), 4_000);
        assert_eq!(t.clamp_playhead(1_000), 3_000);
        assert_eq!(t.clamp_playhead(8_000), 3_000);
    }

    #[test]
    fn test_set_volume_clamps() {
        let mut t = timeline(1_000);
        t.set_volume(&[0], 9.0);
        assert_eq!(t.segments()[0].volume, MAX_VOLUME);
        t.set_volume(&[0], -1.0);
        assert_eq!(t.segments()[0].volume, 0.0);
    }

    #[test]
    fn test_toggle_muted() {
        let mut t = timeline(10_000);
        t.split_at(5_000);
        assert_eq!(t.toggle_muted(&[1, 1]), 1);
        assert!(!t.segments()[0].muted);
        assert!(t.segments()[1].muted);
        assert!(!t.segments()[1].has_neutral_audio());
    }
}
