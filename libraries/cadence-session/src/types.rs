//! Core types for the playback session

use crate::error::{PlaybackError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Track information supplied by the catalog
///
/// Read-only inside the engine. `duration_seconds` is the catalog's hint;
/// the media resource's metadata is authoritative once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier from the catalog
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    pub album: Option<String>,

    /// Duration hint in seconds
    pub duration_seconds: f64,

    /// Locator handed to the media resource
    pub audio_url: String,

    /// Cover art locator (optional)
    pub image_url: Option<String>,
}

/// Loop mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop when the queue ends
    #[default]
    None,

    /// Loop the entire queue
    All,

    /// Loop the current track only
    One,
}

impl LoopMode {
    /// Next mode in the `None → All → One → None` cycle
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::All,
            Self::All => Self::One,
            Self::One => Self::None,
        }
    }
}

/// Subscription tier of the listening user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Skip-limited
    #[default]
    Free,

    /// Unrestricted
    Premium,
}

/// Playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// No track selected
    #[default]
    Idle,

    /// Load issued, metadata not known yet
    Loading,

    /// Metadata known, playback never started
    Ready,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Reached the end with nothing to advance to
    Ended,

    /// The media resource reported a failure
    Error,
}

/// Result of a `next()` / `previous()` request
///
/// Lets the caller tell "nothing to skip to" apart from "blocked by policy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipOutcome {
    /// Moved to the track at `index`
    Advanced { index: usize },

    /// Current track restarted at 0 (previous() past the restart threshold)
    Restarted,

    /// No track in that direction; playback stopped at time 0
    EndOfQueue,

    /// Free-tier skip quota exhausted; state unchanged
    QuotaExceeded { retry_at: DateTime<Utc> },
}

impl SkipOutcome {
    /// True when the skip was blocked by the quota policy
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Configuration for a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Skips allowed per window for free-tier sessions (default: 10)
    pub skip_limit: u32,

    /// Length of the skip window in seconds (default: 3600)
    pub skip_window_secs: u64,

    /// `previous()` restarts the current track past this position (default: 3.0)
    pub restart_threshold_secs: f64,

    /// Initial volume in [0, 1] (default: 1.0)
    pub initial_volume: f32,

    /// Initial loop mode (default: None)
    pub loop_mode: LoopMode,

    /// Broadcast channel capacity for session events (default: 64)
    pub event_capacity: usize,

    /// Command channel capacity for the session actor (default: 32)
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skip_limit: 10,
            skip_window_secs: 3600,
            restart_threshold_secs: 3.0,
            initial_volume: 1.0,
            loop_mode: LoopMode::None,
            event_capacity: 64,
            command_capacity: 32,
        }
    }
}

impl SessionConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.skip_window_secs == 0 {
            return Err(PlaybackError::Config(
                "skip_window_secs must be greater than zero".to_string(),
            ));
        }
        if self.skip_window_secs > i64::MAX as u64 / 1000 {
            return Err(PlaybackError::Config(format!(
                "skip_window_secs is too large: {}",
                self.skip_window_secs
            )));
        }
        if !self.restart_threshold_secs.is_finite() || self.restart_threshold_secs < 0.0 {
            return Err(PlaybackError::Config(format!(
                "restart_threshold_secs must be a non-negative number, got {}",
                self.restart_threshold_secs
            )));
        }
        if self.event_capacity == 0 || self.command_capacity == 0 {
            return Err(PlaybackError::Config(
                "channel capacities must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.skip_limit, 10);
        assert_eq!(config.skip_window_secs, 3600);
        assert_eq!(config.restart_threshold_secs, 3.0);
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.loop_mode, LoopMode::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loop_mode_cycles_through_all_modes() {
        assert_eq!(LoopMode::None.cycle(), LoopMode::All);
        assert_eq!(LoopMode::All.cycle(), LoopMode::One);
        assert_eq!(LoopMode::One.cycle(), LoopMode::None);
    }

    #[test]
    fn config_rejects_zero_window() {
        let config = SessionConfig {
            skip_window_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PlaybackError::Config(_))));
    }

    #[test]
    fn config_rejects_negative_threshold() {
        let config = SessionConfig {
            restart_threshold_secs: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"skip_limit": 6}"#).unwrap();
        assert_eq!(config.skip_limit, 6);
        assert_eq!(config.skip_window_secs, 3600);
    }
}
