//! Cadence - Playback Session Engine
//!
//! Platform-agnostic playback session for a streaming client.
//!
//! This crate provides:
//! - Play / pause / resume with deferred start until metadata is known
//! - An ordered queue with index navigation and loop modes (None, All, One)
//! - Seek by time and by percentage, clamped to the track
//! - Volume and mute
//! - A rolling skip quota for free-tier listeners
//! - Load generations, so late events from a replaced track are ignored
//! - An actor handle for driving a session from async code
//!
//! # Architecture
//!
//! `cadence-session` never touches audio itself. The one stateful playback
//! primitive (an audio element, a native player, a simulator) is supplied
//! through the [`MediaResource`] trait and reports back through a
//! [`MediaEventSink`]. Tier and wall clock are supplied through
//! [`TierSource`] and [`Clock`].
//!
//! # Example: Driving a session directly
//!
//! ```rust
//! use cadence_session::{
//!     ManualClock, MediaEventSink, MediaResource, MediaResourceAdapter, PlaybackSession,
//!     PlaybackStatus, Result, SessionConfig, Tier, Track,
//! };
//!
//! // Implement MediaResource for your platform
//! struct SilentResource;
//!
//! impl MediaResource for SilentResource {
//!     fn load(&mut self, _url: &str, events: MediaEventSink) -> Result<()> {
//!         events.metadata(180.0);
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) -> Result<()> { Ok(()) }
//!     fn seek(&mut self, _position: f64) -> Result<()> { Ok(()) }
//!     fn set_volume(&mut self, _volume: f32) -> Result<()> { Ok(()) }
//! }
//!
//! let (adapter, mut media_events) = MediaResourceAdapter::new(Box::new(SilentResource));
//! let mut session = PlaybackSession::new(
//!     SessionConfig::default(),
//!     adapter,
//!     Tier::Free,
//!     ManualClock::default(),
//! )?;
//!
//! session.play(Track {
//!     id: "t1".to_string(),
//!     title: "My Song".to_string(),
//!     artist: "Artist Name".to_string(),
//!     album: None,
//!     duration_seconds: 180.0,
//!     audio_url: "https://cdn.example/t1.mp3".to_string(),
//!     image_url: None,
//! })?;
//! assert_eq!(session.status(), PlaybackStatus::Loading);
//!
//! // Feed media events back in (the actor does this for you)
//! while let Ok(event) = media_events.try_recv() {
//!     session.handle_adapter_event(event);
//! }
//! assert_eq!(session.status(), PlaybackStatus::Playing);
//! # Ok::<(), cadence_session::PlaybackError>(())
//! ```
//!
//! # Example: Actor handle
//!
//! ```rust,no_run
//! # async fn demo(session: cadence_session::PlaybackSession,
//! #     media_events: tokio::sync::mpsc::UnboundedReceiver<cadence_session::AdapterEvent>,
//! # ) -> cadence_session::Result<()> {
//! use cadence_session::SessionHandle;
//!
//! let (handle, _task) = SessionHandle::spawn(session, media_events);
//! let mut events = handle.subscribe();
//!
//! let outcome = handle.next().await?;
//! if outcome.is_quota_exceeded() {
//!     // tell the listener when skips come back
//! }
//! # let _ = events.recv().await;
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod adapter;
mod clock;
mod error;
mod events;
mod queue;
mod quota;
mod session;
mod tier;
pub mod types;
mod volume;

// Public exports
pub use actor::SessionHandle;
pub use adapter::{
    clamp_position, sanitize_duration, AdapterEvent, Generation, MediaEvent, MediaEventSink,
    MediaResource, MediaResourceAdapter,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MediaFailure, PlaybackError, Result};
pub use events::{SessionEvent, SessionSnapshot};
pub use queue::QueueManager;
pub use quota::{SkipQuota, SkipQuotaPolicy};
pub use session::PlaybackSession;
pub use tier::{SharedTier, TierSource};
pub use types::{LoopMode, PlaybackStatus, SessionConfig, SkipOutcome, Tier, Track};
pub use volume::{clamp_volume, Volume};
