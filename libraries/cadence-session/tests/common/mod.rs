//! Shared test helpers
//!
//! `RecordingResource` records every command the session issues and keeps
//! the event sink of every load, so tests can fire metadata/time/ended/error
//! events for any generation, including stale ones.

#![allow(dead_code)]

use cadence_session::{
    AdapterEvent, ManualClock, MediaEventSink, MediaFailure, MediaResource,
    MediaResourceAdapter, PlaybackError, PlaybackSession, Result, SessionConfig, SessionEvent,
    SharedTier, Tier, Track,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

// ===== Test Helpers =====

pub fn create_test_track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        album: Some("Test Album".to_string()),
        duration_seconds: 180.0,
        audio_url: format!("https://cdn.example/{}.mp3", id),
        image_url: None,
    }
}

pub fn create_tracks(count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| create_test_track(&format!("t{}", i)))
        .collect()
}

/// Command observed by the resource
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    Stop,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<Call>,
    sinks: Vec<MediaEventSink>,
    failing_urls: Vec<String>,
}

/// View into what a `RecordingResource` has seen
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Sink handed to the `n`th load (0-based)
    pub fn sink(&self, n: usize) -> MediaEventSink {
        self.state.lock().unwrap().sinks[n].clone()
    }

    /// Sink handed to the most recent load
    pub fn last_sink(&self) -> MediaEventSink {
        self.state
            .lock()
            .unwrap()
            .sinks
            .last()
            .cloned()
            .expect("no load issued")
    }

    /// Make loads of this url fail synchronously
    pub fn fail_url(&self, url: &str) {
        self.state.lock().unwrap().failing_urls.push(url.to_string());
    }
}

/// Resource that records commands instead of playing audio
pub struct RecordingResource {
    recorder: Recorder,
}

impl RecordingResource {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        (
            Self {
                recorder: recorder.clone(),
            },
            recorder,
        )
    }

    fn record(&self, call: Call) {
        self.recorder.state.lock().unwrap().calls.push(call);
    }
}

impl MediaResource for RecordingResource {
    fn load(&mut self, url: &str, events: MediaEventSink) -> Result<()> {
        self.record(Call::Load(url.to_string()));

        let mut state = self.recorder.state.lock().unwrap();
        if state.failing_urls.iter().any(|failing| failing == url) {
            return Err(PlaybackError::Load(format!("cannot resolve {}", url)));
        }
        state.sinks.push(events);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.record(Call::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(Call::Pause);
        Ok(())
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.record(Call::Seek(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.record(Call::SetVolume(volume));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(Call::Stop);
        Ok(())
    }
}

/// Session wired to a recording resource, a manual clock and a shared tier
pub struct Harness {
    pub session: PlaybackSession,
    pub media: mpsc::UnboundedReceiver<AdapterEvent>,
    pub recorder: Recorder,
    pub clock: ManualClock,
    pub tier: SharedTier,
    pub events: broadcast::Receiver<SessionEvent>,
}

impl Harness {
    pub fn new(tier: Tier) -> Self {
        Self::with_config(tier, SessionConfig::default())
    }

    pub fn with_config(tier: Tier, config: SessionConfig) -> Self {
        let (resource, recorder) = RecordingResource::new();
        let (adapter, media) = MediaResourceAdapter::new(Box::new(resource));
        let clock = ManualClock::default();
        let shared_tier = SharedTier::new(tier);

        let session =
            PlaybackSession::new(config, adapter, shared_tier.clone(), clock.clone()).unwrap();
        let events = session.subscribe();

        Self {
            session,
            media,
            recorder,
            clock,
            tier: shared_tier,
            events,
        }
    }

    /// Deliver every queued media event to the session
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.media.try_recv() {
            self.session.handle_adapter_event(event);
            delivered += 1;
        }
        delivered
    }

    /// Report metadata for the latest load
    pub fn metadata(&mut self, duration: f64) {
        self.recorder.last_sink().metadata(duration);
        self.pump();
    }

    pub fn time_update(&mut self, position: f64) {
        self.recorder.last_sink().time_update(position);
        self.pump();
    }

    pub fn ended(&mut self) {
        self.recorder.last_sink().ended();
        self.pump();
    }

    pub fn error(&mut self, failure: MediaFailure) {
        self.recorder.last_sink().error(failure);
        self.pump();
    }

    /// Load `tracks` and get the first one playing with known metadata
    pub fn start_with(&mut self, tracks: Vec<Track>) {
        self.session.add_to_queue(tracks).unwrap();
        self.metadata(180.0);
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return drained,
            }
        }
    }

    pub fn current_id(&self) -> Option<String> {
        self.session.current_track().map(|t| t.id.clone())
    }
}
