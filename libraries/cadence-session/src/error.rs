//! Error types for the playback session engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// The media resource failed to resolve or decode the track
    #[error("Failed to load track: {0}")]
    Load(String),

    /// The media resource cannot play this format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Playback was refused (e.g. no prior qualifying user gesture)
    #[error("Playback not allowed: {0}")]
    PlaybackNotAllowed(String),

    /// No track is loaded (or its metadata is not known yet)
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A synchronous command to the media resource failed
    #[error("Media resource error: {0}")]
    Resource(String),

    /// The session actor is no longer running
    #[error("Playback session is closed")]
    SessionClosed,

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Failure reported asynchronously by a media resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum MediaFailure {
    /// Resource failed to resolve or decode
    #[error("load failed: {0}")]
    Load(String),

    /// Resource does not understand the format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Resource refused to start playback
    #[error("playback not allowed: {0}")]
    NotAllowed(String),
}

impl MediaFailure {
    /// Human-readable reason
    pub fn reason(&self) -> &str {
        match self {
            Self::Load(reason) | Self::UnsupportedFormat(reason) | Self::NotAllowed(reason) => {
                reason
            }
        }
    }
}

impl From<MediaFailure> for PlaybackError {
    fn from(failure: MediaFailure) -> Self {
        match failure {
            MediaFailure::Load(reason) => Self::Load(reason),
            MediaFailure::UnsupportedFormat(reason) => Self::UnsupportedFormat(reason),
            MediaFailure::NotAllowed(reason) => Self::PlaybackNotAllowed(reason),
        }
    }
}
