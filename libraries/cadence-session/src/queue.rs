//! Ordered play queue
//!
//! Index-based navigation over a single ordered list:
//! - Insertion order is play order
//! - The current position is an index, so moving back and forth never
//!   reorders or consumes tracks
//! - Next/previous targets honor the loop mode but have no side effects

use crate::types::{LoopMode, Track};

/// Ordered queue with a current position
///
/// Structure:
/// ```text
///   0: Track A
///   1: Track B   <- current_index
///   2: Track C
/// ```
///
/// Invariant: `current_index`, when set, is always `< tracks.len()`.
#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    tracks: Vec<Track>,
    current_index: Option<usize>,
}

impl QueueManager {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks to the end, preserving their order
    ///
    /// Selects index 0 if the queue had no selection and the append made
    /// it non-empty. Selection only; starting playback is the session's call.
    pub fn append(&mut self, tracks: Vec<Track>) {
        self.tracks.extend(tracks);
        if self.current_index.is_none() && !self.tracks.is_empty() {
            self.current_index = Some(0);
        }
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
    }

    /// Position of a track by id
    pub fn index_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Index that follows the current one
    ///
    /// With no selection the first track is next. Wraps to 0 only in
    /// `LoopMode::All`.
    pub fn next_index(&self, loop_mode: LoopMode) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        match self.current_index {
            None => Some(0),
            Some(index) if index + 1 < len => Some(index + 1),
            Some(_) if loop_mode == LoopMode::All => Some(0),
            Some(_) => None,
        }
    }

    /// Index that precedes the current one
    ///
    /// Wraps to the last track only in `LoopMode::All`.
    pub fn previous_index(&self, loop_mode: LoopMode) -> Option<usize> {
        let len = self.tracks.len();
        match self.current_index {
            Some(index) if index > 0 => Some(index - 1),
            _ if loop_mode == LoopMode::All && len > 0 => Some(len - 1),
            _ => None,
        }
    }

    /// Move the current position to `index`
    ///
    /// Returns the selected track, or `None` (position unchanged) when out of bounds.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current_index = Some(index);
        self.tracks.get(index)
    }

    /// Drop the current position without touching the tracks
    ///
    /// Used when the playing track is no longer part of the queue; the next
    /// forward navigation then starts from index 0.
    pub fn deselect(&mut self) {
        self.current_index = None;
    }

    /// Remove track from queue by index
    ///
    /// Tracks after the current one keep their relative position. Removing
    /// the current track leaves the position on whatever slid into its place.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }

        let track = self.tracks.remove(index);

        self.current_index = match self.current_index {
            Some(current) if index < current => Some(current - 1),
            Some(current) if current >= self.tracks.len() => None,
            other => other,
        };

        Some(track)
    }

    /// Get track at index
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track at the current position
    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    /// Current position
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// All tracks in play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
