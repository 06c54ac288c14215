//! Session events and snapshots
//!
//! Event-based communication for UI synchronization. Events are broadcast at
//! key points:
//! - State changes (loading/playing/paused/ended/error)
//! - Track changes (every accepted load)
//! - Position and duration updates from the media resource
//! - Volume, queue, loop mode and skip quota changes
//!
//! A [`SessionSnapshot`] is the full observable state at one instant; late
//! subscribers read one and then follow the event stream.

use crate::error::PlaybackError;
use crate::types::{LoopMode, PlaybackStatus, Tier, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Playback status changed
    StateChanged {
        /// The new status
        status: PlaybackStatus,
        /// Whether playback is requested
        is_playing: bool,
    },

    /// A new track was loaded
    TrackChanged {
        /// ID of the new (current) track
        track_id: String,
        /// ID of the previous track (if any)
        previous_track_id: Option<String>,
        /// Queue position of the new track
        queue_index: Option<usize>,
        /// Load generation the track was issued under
        generation: u64,
    },

    /// Track finished playing naturally (reached end)
    TrackFinished {
        /// ID of the finished track
        track_id: String,
    },

    /// Position update from the media resource
    PositionUpdate {
        /// Current position in seconds
        position_secs: f64,
        /// Track duration in seconds
        duration_secs: f64,
    },

    /// Track duration became known
    DurationChanged {
        /// Duration in seconds
        duration_secs: f64,
    },

    /// Volume changed
    VolumeChanged {
        /// Volume level (0.0-1.0)
        level: f32,
        /// Whether audio is muted
        is_muted: bool,
    },

    /// Queue changed (tracks added/removed/cleared)
    QueueChanged {
        /// New queue length
        length: usize,
        /// Current position
        queue_index: Option<usize>,
    },

    /// Loop mode changed
    LoopModeChanged {
        /// The new mode
        mode: LoopMode,
    },

    /// Free-tier skips left in the current window
    SkipsChanged {
        /// Skips left
        remaining: u32,
    },

    /// A skip was refused by the free-tier quota
    QuotaExceeded {
        /// When the allowance refills
        retry_at: DateTime<Utc>,
    },

    /// Playback failed
    Error {
        /// Error message
        message: String,
    },

    /// The session was reset (e.g. sign-out)
    SessionEnded,
}

/// Observable state of a session at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    pub is_playing: bool,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
    pub volume: f32,
    pub muted: bool,
    pub queue: Vec<Track>,
    pub queue_index: Option<usize>,
    pub loop_mode: LoopMode,
    /// `None` for premium sessions
    pub skips_remaining: Option<u32>,
    pub tier: Tier,
    pub load_generation: u64,
    /// Last failure reported by the media resource, cleared by the next load
    #[serde(skip)]
    pub last_error: Option<PlaybackError>,
}

impl SessionSnapshot {
    /// Playback progress in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.current_time_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
