//! Bounded snapshot-based undo/redo.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Immutable copy of a segment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistorySnapshot {
    segments: Vec<Segment>,
}

impl HistorySnapshot {
    pub fn new(segments: &[Segment]) -> Self {
        Self {
            segments: segments.to_vec(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

/// Two bounded stacks of snapshots.
///
/// `save` is called with the state *before* a destructive edit. Any new
/// save invalidates the redo branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStack {
    capacity: usize,
    undo: VecDeque<HistorySnapshot>,
    redo: Vec<HistorySnapshot>,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest entries of both stacks if
    /// it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        if self.redo.len() > self.capacity {
            let excess = self.redo.len() - self.capacity;
            self.redo.drain(..excess);
        }
    }

    /// Record a pre-edit snapshot.
    pub fn save(&mut self, snapshot: HistorySnapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
            tracing::debug!(capacity = self.capacity, "Evicted oldest undo snapshot");
        }
        self.redo.clear();
    }

    /// Step back. `current` moves onto the redo stack.
    pub fn undo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward. `current` moves back onto the undo stack.
    pub fn redo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        Some(next)
    }

    /// The snapshot `undo` would return next.
    pub fn peek_undo(&self) -> Option<&HistorySnapshot> {
        self.undo.back()
    }

    /// The snapshot `redo` would return next.
    pub fn peek_redo(&self) -> Option<&HistorySnapshot> {
        self.redo.last()
    }

    /// Every stored snapshot, undo entries first.
    pub fn snapshots(&self) -> impl Iterator<Item = &HistorySnapshot> {
        self.undo.iter().chain(self.redo.iter())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
