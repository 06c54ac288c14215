//! Media resource adapter
//!
//! Abstracts the one stateful playback primitive a session drives (an HTML
//! audio element, a native player, a simulated resource in tests).
//!
//! Every `load` opens a new *generation*. The resource reports back through
//! the [`MediaEventSink`] it was handed for that load, and the sink stamps
//! each event with its generation. Events from a superseded load therefore
//! carry an old generation and are dropped by [`MediaResourceAdapter::observe`].

use crate::error::{MediaFailure, PlaybackError, Result};
use crate::types::Track;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Load generation token
///
/// Strictly increasing per adapter; 0 means nothing was ever loaded.
pub type Generation = u64;

/// Asynchronous notification from a media resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Metadata is known (duration in seconds)
    Metadata { duration: f64 },

    /// Playback position advanced (seconds)
    TimeUpdate { position: f64 },

    /// Playback reached the end of the media
    Ended,

    /// The resource failed
    Error(MediaFailure),
}

/// Media event tagged with the load that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterEvent {
    /// Generation of the load this event belongs to
    pub generation: Generation,

    /// The event itself
    pub event: MediaEvent,
}

/// Per-load event channel handed to the resource
///
/// Cheap to clone; resources typically move a clone into whatever task
/// drives the load.
#[derive(Debug, Clone)]
pub struct MediaEventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<AdapterEvent>,
}

impl MediaEventSink {
    /// Generation this sink stamps on its events
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Forward an event to the session
    ///
    /// Returns false once the session has gone away.
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.tx
            .send(AdapterEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Report the media duration
    pub fn metadata(&self, duration: f64) -> bool {
        self.emit(MediaEvent::Metadata { duration })
    }

    /// Report the current position
    pub fn time_update(&self, position: f64) -> bool {
        self.emit(MediaEvent::TimeUpdate { position })
    }

    /// Report that playback reached the end
    pub fn ended(&self) -> bool {
        self.emit(MediaEvent::Ended)
    }

    /// Report a failure
    pub fn error(&self, failure: MediaFailure) -> bool {
        self.emit(MediaEvent::Error(failure))
    }
}

/// Platform media-playback primitive
///
/// Implementors start loading on `load` and report progress through the
/// given sink at any later time. Commands return quickly; failures that
/// happen later are reported as [`MediaEvent::Error`].
#[cfg_attr(test, mockall::automock)]
pub trait MediaResource: Send {
    /// Start loading a new locator, replacing whatever was loaded
    fn load(&mut self, url: &str, events: MediaEventSink) -> Result<()>;

    /// Start or resume output
    fn play(&mut self) -> Result<()>;

    /// Pause output
    fn pause(&mut self) -> Result<()>;

    /// Jump to a position in seconds (already clamped by the adapter)
    fn seek(&mut self, position: f64) -> Result<()>;

    /// Set output volume in [0, 1] (already clamped by the adapter)
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Stop output and release the loaded media
    ///
    /// Defaults to `pause()`.
    fn stop(&mut self) -> Result<()> {
        self.pause()
    }
}

/// Clamp a seek request into [0, duration]
///
/// NaN is treated as the start of the track.
pub fn clamp_position(position: f64, duration: f64) -> f64 {
    let upper = sanitize_duration(duration);
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, upper)
    }
}

/// Negative or non-finite durations are reported as 0
pub fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// Façade over exactly one [`MediaResource`]
///
/// Owns the generation counter and the event channel the session listens on.
pub struct MediaResourceAdapter {
    resource: Box<dyn MediaResource>,
    events_tx: mpsc::UnboundedSender<AdapterEvent>,
    generation: Generation,
    loaded: bool,
    duration: Option<f64>,
}

impl MediaResourceAdapter {
    /// Wrap a resource
    ///
    /// Returns the adapter and the receiving end of its event channel; the
    /// session's driver feeds those events back into the session.
    pub fn new(
        resource: Box<dyn MediaResource>,
    ) -> (Self, mpsc::UnboundedReceiver<AdapterEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let adapter = Self {
            resource,
            events_tx,
            generation: 0,
            loaded: false,
            duration: None,
        };
        (adapter, events_rx)
    }

    /// Begin loading a track under a fresh generation
    ///
    /// The generation is bumped before the resource is called, so even a
    /// failed load supersedes the previous one.
    pub fn load(&mut self, track: &Track) -> Result<Generation> {
        self.generation += 1;
        self.duration = None;
        self.loaded = false;

        debug!(
            generation = self.generation,
            track_id = %track.id,
            url = %track.audio_url,
            "loading media"
        );

        let sink = MediaEventSink {
            generation: self.generation,
            tx: self.events_tx.clone(),
        };
        self.resource.load(&track.audio_url, sink)?;
        self.loaded = true;

        Ok(self.generation)
    }

    /// Start or resume output (no-op when nothing is loaded)
    pub fn play(&mut self) -> Result<()> {
        if !self.loaded {
            return Ok(());
        }
        self.resource.play()
    }

    /// Pause output (no-op when nothing is loaded)
    pub fn pause(&mut self) -> Result<()> {
        if !self.loaded {
            return Ok(());
        }
        self.resource.pause()
    }

    /// Seek within the loaded track
    ///
    /// Clamps to [0, duration] and returns the applied position. Fails only
    /// when metadata has not arrived yet.
    pub fn seek(&mut self, seconds: f64) -> Result<f64> {
        let duration = match (self.loaded, self.duration) {
            (true, Some(duration)) => duration,
            _ => return Err(PlaybackError::NoTrackLoaded),
        };

        let position = clamp_position(seconds, duration);
        self.resource.seek(position)?;
        Ok(position)
    }

    /// Set output volume, clamped to [0, 1]
    ///
    /// Applied even when nothing is loaded so the next load starts at the
    /// right level.
    pub fn set_volume(&mut self, volume: f32) -> Result<f32> {
        let volume = crate::volume::clamp_volume(volume);
        self.resource.set_volume(volume)?;
        Ok(volume)
    }

    /// Stop output and invalidate the current generation
    pub fn stop(&mut self) -> Result<()> {
        self.generation += 1;
        self.duration = None;

        if !self.loaded {
            return Ok(());
        }
        self.loaded = false;
        self.resource.stop()
    }

    /// Check an incoming event against the current generation
    ///
    /// Returns false for stale events. Records the duration carried by
    /// current metadata events.
    pub fn observe(&mut self, event: &AdapterEvent) -> bool {
        if event.generation != self.generation {
            trace!(
                event_generation = event.generation,
                current_generation = self.generation,
                "discarding stale media event"
            );
            return false;
        }

        if let MediaEvent::Metadata { duration } = event.event {
            self.duration = Some(sanitize_duration(duration));
        }

        true
    }

    /// Current generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Duration of the loaded track, once metadata arrived
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Whether a load is in effect
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl std::fmt::Debug for MediaResourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResourceAdapter")
            .field("generation", &self.generation)
            .field("loaded", &self.loaded)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}
