//! Playback session - core orchestration
//!
//! Owns the current track, queue, loop mode, volume and skip quota, drives
//! the media resource adapter, and reconciles the resource's asynchronous
//! events back into observable state.
//!
//! # State machine
//!
//! ```text
//! Idle ──play/add──▶ Loading ──metadata──▶ Ready ──play──▶ Playing ⇄ Paused
//!                       │   (is_playing) ─────────────────▶ Playing
//!                       │                                      │
//!                       └──────────── error ──▶ Error ◀────────┘
//! Playing ──ended──▶ (loop One: restart | next index: Loading | none: Ended)
//! ```
//!
//! Every load bumps the adapter's generation; events from older generations
//! are dropped before they can touch state.

use crate::{
    adapter::{clamp_position, AdapterEvent, Generation, MediaEvent, MediaResourceAdapter},
    clock::Clock,
    error::{MediaFailure, PlaybackError, Result},
    events::{SessionEvent, SessionSnapshot},
    queue::QueueManager,
    quota::SkipQuotaPolicy,
    tier::TierSource,
    types::{LoopMode, PlaybackStatus, SessionConfig, SkipOutcome, Tier, Track},
    volume::Volume,
};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One listening session
///
/// Created when a user starts listening (e.g. on sign-in) and reset with
/// [`PlaybackSession::end_session`]. All mutation goes through the intent
/// methods and [`PlaybackSession::handle_adapter_event`]; run it on a single
/// task (see [`crate::SessionHandle`]) or drive it directly from one thread.
pub struct PlaybackSession {
    id: Uuid,
    config: SessionConfig,

    // State
    status: PlaybackStatus,
    current_track: Option<Track>,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    last_error: Option<PlaybackError>,

    // Settings
    volume: Volume,
    loop_mode: LoopMode,

    // Navigation and policy
    queue: QueueManager,
    quota: SkipQuotaPolicy,

    // Collaborators
    tier: Box<dyn TierSource>,
    clock: Arc<dyn Clock>,
    adapter: MediaResourceAdapter,

    events: broadcast::Sender<SessionEvent>,
}

impl PlaybackSession {
    /// Create a new session
    ///
    /// Fails only on an invalid configuration.
    pub fn new(
        config: SessionConfig,
        adapter: MediaResourceAdapter,
        tier: impl TierSource + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(clock);
        let window = Duration::seconds(config.skip_window_secs as i64);
        let quota = SkipQuotaPolicy::new(config.skip_limit, window, clock.now());
        let (events, _) = broadcast::channel(config.event_capacity);
        let id = Uuid::new_v4();

        info!(session = %id, "playback session created");

        Ok(Self {
            id,
            status: PlaybackStatus::Idle,
            current_track: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            last_error: None,
            volume: Volume::new(config.initial_volume),
            loop_mode: config.loop_mode,
            queue: QueueManager::new(),
            quota,
            tier: Box::new(tier),
            clock,
            adapter,
            events,
            config,
        })
    }

    // ===== Playback Control =====

    /// Play a track
    ///
    /// The current track resumes instead of reloading. Any other track is
    /// selected in the queue (appended if absent) and loaded; output starts
    /// once its metadata arrives.
    pub fn play(&mut self, track: Track) -> Result<()> {
        if self
            .current_track
            .as_ref()
            .is_some_and(|current| current.id == track.id)
        {
            return self.resume();
        }

        let index = match self.queue.index_of(&track.id) {
            Some(index) => index,
            None => {
                self.queue.append(vec![track]);
                self.emit_queue_changed();
                self.queue.len() - 1
            }
        };

        self.load_index(index)
    }

    /// Start or resume the current track
    ///
    /// - Error: reloads the track under a new generation
    /// - Ended: restarts from 0
    /// - Loading: records the intent, output starts on metadata
    pub fn resume(&mut self) -> Result<()> {
        let Some(track) = self.current_track.clone() else {
            return Ok(());
        };

        match self.status {
            PlaybackStatus::Idle | PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Error => self.reload(track),
            PlaybackStatus::Ended if self.adapter.duration().is_none() => self.reload(track),
            PlaybackStatus::Ended => {
                self.adapter.seek(0.0)?;
                self.set_position(0.0);
                self.start_output()
            }
            PlaybackStatus::Loading => {
                self.is_playing = true;
                self.emit_state_changed();
                Ok(())
            }
            PlaybackStatus::Ready | PlaybackStatus::Paused => self.start_output(),
        }
    }

    /// Pause playback
    pub fn pause(&mut self) -> Result<()> {
        match self.status {
            PlaybackStatus::Playing => {
                self.adapter.pause()?;
                self.is_playing = false;
                self.set_status(PlaybackStatus::Paused);
            }
            PlaybackStatus::Loading if self.is_playing => {
                self.is_playing = false;
                self.emit_state_changed();
            }
            _ => {}
        }
        Ok(())
    }

    /// Flip between playing and paused (no-op when idle)
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.status == PlaybackStatus::Idle {
            return Ok(());
        }

        if self.is_playing {
            self.pause()
        } else {
            self.resume()
        }
    }

    /// Skip to next track
    ///
    /// Charges one skip for free-tier sessions. A refused skip leaves the
    /// session untouched and reports [`SkipOutcome::QuotaExceeded`].
    pub fn next(&mut self) -> Result<SkipOutcome> {
        let target = self.queue.next_index(self.loop_mode);
        self.skip_to(target)
    }

    /// Go to previous track
    ///
    /// Past the restart threshold (3 s by default) the current track restarts
    /// at 0 without navigating or charging a skip. Otherwise mirrors
    /// [`PlaybackSession::next`].
    pub fn previous(&mut self) -> Result<SkipOutcome> {
        if self.current_track.is_some() && self.current_time > self.config.restart_threshold_secs
        {
            self.adapter.seek(0.0)?;
            self.set_position(0.0);
            debug!(session = %self.id, "previous restarted current track");
            return Ok(SkipOutcome::Restarted);
        }

        let target = self.queue.previous_index(self.loop_mode);
        self.skip_to(target)
    }

    /// Play the queue entry at `index` (the user picked it; no skip charged)
    pub fn play_at(&mut self, index: usize) -> Result<()> {
        let Some(track) = self.queue.get(index) else {
            return Err(PlaybackError::IndexOutOfBounds(index));
        };

        let is_current = self.queue.current_index() == Some(index)
            && self
                .current_track
                .as_ref()
                .is_some_and(|current| current.id == track.id);

        if is_current {
            self.resume()
        } else {
            self.load_index(index)
        }
    }

    // ===== Seek =====

    /// Seek to position in current track (seconds, clamped)
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.current_track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }

        let position = self.adapter.seek(seconds)?;
        self.set_position(position);
        Ok(())
    }

    /// Seek to position in current track (by fraction, clamped to [0, 1])
    pub fn seek_percent(&mut self, fraction: f64) -> Result<()> {
        if self.current_track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        let duration = self.adapter.duration().ok_or(PlaybackError::NoTrackLoaded)?;

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.seek(duration * fraction)
    }

    // ===== Volume =====

    /// Set volume in [0, 1] (clamped); also unmutes
    pub fn set_volume(&mut self, level: f32) -> Result<()> {
        self.volume.set_level(level);
        self.volume.unmute();
        self.apply_volume()
    }

    /// Mute audio
    pub fn mute(&mut self) -> Result<()> {
        self.volume.mute();
        self.apply_volume()
    }

    /// Unmute audio
    pub fn unmute(&mut self) -> Result<()> {
        self.volume.unmute();
        self.apply_volume()
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) -> Result<()> {
        self.volume.toggle_mute();
        self.apply_volume()
    }

    // ===== Queue Management =====

    /// Append tracks to the queue
    ///
    /// On a session with no track at all, playback of the first appended
    /// track starts immediately.
    pub fn add_to_queue(&mut self, tracks: Vec<Track>) -> Result<()> {
        if tracks.is_empty() {
            return Ok(());
        }

        let was_empty = self.queue.is_empty();
        self.queue.append(tracks);

        if was_empty {
            let Some(current_id) = self.current_track.as_ref().map(|t| t.id.clone()) else {
                self.emit_queue_changed();
                return self.load_index(0);
            };

            // The queue was cleared while this track kept playing; appended
            // tracks follow it.
            if self.queue.current().map(|t| t.id.as_str()) != Some(current_id.as_str()) {
                self.queue.deselect();
            }
        }

        self.emit_queue_changed();
        Ok(())
    }

    /// Empty the queue
    ///
    /// The current track keeps playing; it just no longer has a queue position.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.emit_queue_changed();
    }

    /// Remove track from queue by index
    ///
    /// The track that is currently loaded cannot be removed.
    pub fn remove_from_queue(&mut self, index: usize) -> Result<Track> {
        let removing_current = self.queue.current_index() == Some(index)
            && self.current_track.is_some()
            && self.status != PlaybackStatus::Idle;
        if removing_current {
            return Err(PlaybackError::InvalidOperation(
                "cannot remove the track that is currently loaded".to_string(),
            ));
        }

        let track = self
            .queue
            .remove(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        self.emit_queue_changed();
        Ok(track)
    }

    // ===== Loop =====

    /// Cycle loop mode `None → All → One → None`
    ///
    /// Only affects the next natural end of track or boundary navigation.
    pub fn toggle_loop(&mut self) -> LoopMode {
        self.loop_mode = self.loop_mode.cycle();
        debug!(session = %self.id, mode = ?self.loop_mode, "loop mode changed");
        self.emit(SessionEvent::LoopModeChanged {
            mode: self.loop_mode,
        });
        self.loop_mode
    }

    // ===== Lifecycle =====

    /// Stop playback and clear everything back to empty-queue defaults
    ///
    /// In-flight loads are invalidated. State is cleared even if the
    /// resource fails to stop; that failure is returned afterwards.
    pub fn end_session(&mut self) -> Result<()> {
        let stopped = self.adapter.stop();
        if let Err(err) = &stopped {
            warn!(session = %self.id, error = %err, "media resource failed to stop");
        }

        let now = self.clock.now();
        self.queue.clear();
        self.current_track = None;
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_error = None;
        self.status = PlaybackStatus::Idle;
        self.volume = Volume::new(self.config.initial_volume);
        self.loop_mode = self.config.loop_mode;
        self.quota.reset(now);

        info!(session = %self.id, "playback session ended");
        self.emit(SessionEvent::SessionEnded);

        stopped
    }

    // ===== Adapter Events =====

    /// Reconcile one event from the media resource
    ///
    /// Events from superseded loads are discarded without any state change.
    pub fn handle_adapter_event(&mut self, event: AdapterEvent) {
        if !self.adapter.observe(&event) {
            return;
        }

        match event.event {
            MediaEvent::Metadata { .. } => self.on_metadata(),
            MediaEvent::TimeUpdate { position } => self.set_position(position),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Error(failure) => self.on_error(failure),
        }
    }

    fn on_metadata(&mut self) {
        self.duration = self.adapter.duration().unwrap_or(0.0);
        self.emit(SessionEvent::DurationChanged {
            duration_secs: self.duration,
        });
        self.current_time = clamp_position(self.current_time, self.duration);

        if self.status != PlaybackStatus::Loading {
            return;
        }

        if self.is_playing {
            if let Err(err) = self.start_output() {
                debug!(session = %self.id, error = %err, "could not start after metadata");
            }
        } else {
            self.set_status(PlaybackStatus::Ready);
        }
    }

    fn on_ended(&mut self) {
        if let Some(track) = &self.current_track {
            let track_id = track.id.clone();
            self.emit(SessionEvent::TrackFinished { track_id });
        }

        if self.loop_mode == LoopMode::One {
            if self.adapter.duration().is_none() {
                if let Some(track) = self.current_track.clone() {
                    if let Err(err) = self.reload(track) {
                        debug!(session = %self.id, error = %err, "loop reload failed");
                    }
                }
                return;
            }
            let restarted = self
                .adapter
                .seek(0.0)
                .and_then(|_| self.adapter.play());
            match restarted {
                Ok(()) => {
                    self.set_position(0.0);
                    self.is_playing = true;
                    self.set_status(PlaybackStatus::Playing);
                }
                Err(err) => self.fail(err),
            }
            return;
        }

        // Natural end of track is not a user skip: never charged.
        match self.queue.next_index(self.loop_mode) {
            Some(index) => {
                if let Err(err) = self.load_index(index) {
                    debug!(session = %self.id, error = %err, "auto-advance failed");
                }
            }
            None => {
                if self.adapter.duration().is_some() {
                    if let Err(err) = self.adapter.seek(0.0) {
                        debug!(session = %self.id, error = %err, "rewind after end failed");
                    }
                }
                self.is_playing = false;
                self.set_position(0.0);
                self.set_status(PlaybackStatus::Ended);
            }
        }
    }

    fn on_error(&mut self, failure: MediaFailure) {
        self.fail(failure.into());
    }

    // ===== State Queries =====

    /// Full observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_track: self.current_track.clone(),
            status: self.status,
            is_playing: self.is_playing,
            current_time_seconds: self.current_time,
            duration_seconds: self.duration,
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            queue: self.queue.tracks().to_vec(),
            queue_index: self.queue.current_index(),
            loop_mode: self.loop_mode,
            skips_remaining: self.skips_remaining(),
            tier: self.tier(),
            load_generation: self.adapter.generation(),
            last_error: self.last_error.clone(),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    /// Session identifier (used in logs)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current playback status
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Currently selected track
    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    /// Whether playback is requested
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Current position in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Track duration in seconds (0 until metadata is known)
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Volume level (0.0-1.0)
    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    /// Tracks in play order
    pub fn queue(&self) -> &[Track] {
        self.queue.tracks()
    }

    /// Current queue position
    pub fn queue_index(&self) -> Option<usize> {
        self.queue.current_index()
    }

    /// Current loop mode
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Free-tier skips left in the current window (`None` for premium)
    pub fn skips_remaining(&self) -> Option<u32> {
        self.quota.remaining(self.tier(), self.clock.now())
    }

    /// Tier as currently reported by the auth collaborator
    pub fn tier(&self) -> Tier {
        self.tier.tier()
    }

    /// Current load generation
    pub fn generation(&self) -> Generation {
        self.adapter.generation()
    }

    /// Last failure reported by the media resource
    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    // ===== Internal =====

    /// Shared skip path for next/previous
    fn skip_to(&mut self, target: Option<usize>) -> Result<SkipOutcome> {
        let tier = self.tier();
        let now = self.clock.now();

        if !self.quota.can_skip(tier, now) {
            let retry_at = self.quota.retry_at();
            info!(session = %self.id, %retry_at, "skip blocked by quota");
            self.emit(SessionEvent::QuotaExceeded { retry_at });
            return Ok(SkipOutcome::QuotaExceeded { retry_at });
        }

        let Some(index) = target else {
            self.stop_at_start()?;
            return Ok(SkipOutcome::EndOfQueue);
        };

        self.quota.consume(tier, now);
        if let Some(remaining) = self.quota.remaining(tier, now) {
            self.emit(SessionEvent::SkipsChanged { remaining });
        }

        self.load_index(index)?;
        Ok(SkipOutcome::Advanced { index })
    }

    /// Stop at the queue boundary, keeping the current track at time 0
    fn stop_at_start(&mut self) -> Result<()> {
        if self.current_track.is_none() {
            return Ok(());
        }

        self.adapter.pause()?;
        if self.adapter.duration().is_some() {
            self.adapter.seek(0.0)?;
        }

        self.is_playing = false;
        self.set_position(0.0);
        self.set_status(PlaybackStatus::Ended);
        Ok(())
    }

    /// Re-issue the load for the current track
    fn reload(&mut self, track: Track) -> Result<()> {
        match self.queue.index_of(&track.id) {
            Some(index) => self.load_index(index),
            None => self.load_track(track),
        }
    }

    fn load_index(&mut self, index: usize) -> Result<()> {
        let track = self
            .queue
            .select(index)
            .cloned()
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        self.load_track(track)
    }

    /// Load path shared by every intent that changes track
    fn load_track(&mut self, track: Track) -> Result<()> {
        let previous_track_id = self.current_track.as_ref().map(|t| t.id.clone());
        let track_id = track.id.clone();

        self.current_track = Some(track.clone());
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_error = None;
        self.is_playing = true;
        self.status = PlaybackStatus::Loading;

        let loaded = self.adapter.load(&track);

        info!(
            session = %self.id,
            track_id = %track_id,
            generation = self.adapter.generation(),
            "track changed"
        );
        self.emit(SessionEvent::TrackChanged {
            track_id,
            previous_track_id,
            queue_index: self.queue.current_index(),
            generation: self.adapter.generation(),
        });

        if let Err(err) = loaded {
            self.fail(err.clone());
            return Err(err);
        }

        if let Err(err) = self.adapter.set_volume(self.volume.effective()) {
            warn!(session = %self.id, error = %err, "could not apply volume to new track");
        }

        self.emit_state_changed();
        Ok(())
    }

    /// Command output and mark the session playing
    fn start_output(&mut self) -> Result<()> {
        if let Err(err) = self.adapter.play() {
            self.fail(err.clone());
            return Err(err);
        }
        self.is_playing = true;
        self.set_status(PlaybackStatus::Playing);
        Ok(())
    }

    fn apply_volume(&mut self) -> Result<()> {
        self.adapter.set_volume(self.volume.effective())?;
        self.emit(SessionEvent::VolumeChanged {
            level: self.volume.level(),
            is_muted: self.volume.is_muted(),
        });
        Ok(())
    }

    fn fail(&mut self, error: PlaybackError) {
        warn!(session = %self.id, error = %error, "playback failed");

        self.is_playing = false;
        self.status = PlaybackStatus::Error;
        self.emit(SessionEvent::Error {
            message: error.to_string(),
        });
        self.last_error = Some(error);
        self.emit_state_changed();
    }

    fn set_position(&mut self, position: f64) {
        self.current_time = clamp_position(position, self.duration);
        self.emit(SessionEvent::PositionUpdate {
            position_secs: self.current_time,
            duration_secs: self.duration,
        });
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
        self.emit_state_changed();
    }

    fn emit_state_changed(&self) {
        self.emit(SessionEvent::StateChanged {
            status: self.status,
            is_playing: self.is_playing,
        });
    }

    fn emit_queue_changed(&self) {
        self.emit(SessionEvent::QueueChanged {
            length: self.queue.len(),
            queue_index: self.queue.current_index(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("current_track", &self.current_track.as_ref().map(|t| &t.id))
            .field("queue_len", &self.queue.len())
            .field("generation", &self.adapter.generation())
            .finish_non_exhaustive()
    }
}
