//! Scripted listening session
//!
//! Builds a session over a [`SimulatedResource`], queues a synthetic
//! catalog, fires a number of user skips and lets the queue play out while
//! every session event is logged.

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::simulated::SimulatedResource;
use cadence_session::{
    LoopMode, MediaResourceAdapter, PlaybackSession, PlaybackStatus, SessionEvent, SessionHandle,
    SessionSnapshot, SharedTier, SkipOutcome, SystemClock, Tier, Track,
};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Longest a run may go on without an explicit `max_duration`
const MAX_TIME_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// What to simulate
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub tier: Tier,
    pub tracks: usize,
    pub track_seconds: f64,
    /// Simulated seconds per wall-clock second
    pub speed: f64,
    /// Overrides the configured loop mode
    pub loop_mode: Option<LoopMode>,
    /// User skips to attempt once playback starts
    pub skips: u32,
    /// Wall-clock limit for the whole run
    pub max_duration: Option<Duration>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            tier: Tier::Free,
            tracks: 5,
            track_seconds: 30.0,
            speed: 10.0,
            loop_mode: None,
            skips: 0,
            max_duration: None,
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.tracks == 0 {
            return Err(CliError::InvalidArgument(
                "at least one track is required".to_string(),
            ));
        }
        if !self.track_seconds.is_finite() || self.track_seconds <= 0.0 {
            return Err(CliError::InvalidArgument(format!(
                "track length must be positive, got {}",
                self.track_seconds
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(CliError::InvalidArgument(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        Ok(())
    }

    /// Default limit: the whole queue twice over, plus slack for loading
    fn time_limit(&self) -> Duration {
        self.max_duration.unwrap_or_else(|| {
            let queue_secs = self.tracks as f64 * self.track_seconds / self.speed;
            Duration::try_from_secs_f64(queue_secs * 2.0 + 5.0)
                .map_or(MAX_TIME_LIMIT, |limit| limit.min(MAX_TIME_LIMIT))
        })
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub tracks_finished: usize,
    pub skips_taken: u32,
    pub skips_blocked: u32,
    pub errors: usize,
    pub timed_out: bool,
    pub final_state: SessionSnapshot,
}

/// Synthetic catalog
pub fn catalog(count: usize, track_seconds: f64) -> Vec<Track> {
    (1..=count)
        .map(|n| Track {
            id: format!("sim-{}", n),
            title: format!("Simulated Track {}", n),
            artist: "Cadence Simulator".to_string(),
            album: Some("Simulations".to_string()),
            duration_seconds: track_seconds,
            audio_url: format!("sim://track/{}", n),
            image_url: None,
        })
        .collect()
}

#[derive(Debug, Default)]
struct Tally {
    tracks_finished: usize,
    errors: usize,
}

impl Tally {
    fn record(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::TrackFinished { track_id } => {
                self.tracks_finished += 1;
                info!(track_id = %track_id, "track finished");
            }
            SessionEvent::TrackChanged {
                track_id,
                queue_index,
                generation,
                ..
            } => info!(track_id = %track_id, ?queue_index, generation, "track changed"),
            SessionEvent::QuotaExceeded { retry_at } => {
                info!(%retry_at, "skip blocked by quota");
            }
            SessionEvent::Error { message } => {
                self.errors += 1;
                warn!(%message, "playback error");
            }
            SessionEvent::PositionUpdate { .. } => debug!(?event, "session event"),
            other => info!(event = ?other, "session event"),
        }
    }
}

/// Run a scripted session to completion
pub async fn run(config: &CliConfig, options: &SimulationOptions) -> Result<SimulationReport> {
    config.validate()?;
    options.validate()?;

    let mut session_config = config.session.clone();
    if let Some(mode) = options.loop_mode {
        session_config.loop_mode = mode;
    }

    let tracks = catalog(options.tracks, options.track_seconds);
    let resource = tracks.iter().fold(
        SimulatedResource::new(config.simulation.clone(), options.track_seconds, options.speed),
        |resource, track| resource.with_duration(track.audio_url.clone(), track.duration_seconds),
    );
    let (adapter, media_events) = MediaResourceAdapter::new(Box::new(resource));
    let tier = SharedTier::new(options.tier);
    let session = PlaybackSession::new(session_config, adapter, tier, SystemClock)?;

    let (handle, task) = SessionHandle::spawn(session, media_events);
    let mut events = handle.subscribe();
    let mut tally = Tally::default();

    info!(
        session = %handle.id(),
        tier = ?options.tier,
        tracks = options.tracks,
        speed = options.speed,
        "starting simulated session"
    );

    handle.add_to_queue(tracks).await?;

    let tick = Duration::from_millis(config.simulation.tick_ms);
    let mut skips_taken = 0;
    let mut skips_blocked = 0;
    for _ in 0..options.skips {
        drain(&mut events, &mut tally);
        tokio::time::sleep(tick).await;

        match handle.next().await? {
            SkipOutcome::Advanced { index } => {
                skips_taken += 1;
                info!(index, "skipped");
            }
            SkipOutcome::QuotaExceeded { retry_at } => {
                skips_blocked += 1;
                info!(%retry_at, "skip refused");
            }
            outcome => info!(?outcome, "skip had no effect"),
        }
    }

    let limit = options.time_limit();
    let timed_out = tokio::time::timeout(limit, wait_for_end(&mut events, &mut tally))
        .await
        .is_err();
    if timed_out {
        info!(?limit, "time limit reached");
    }

    let final_state = handle.snapshot().await?;
    handle.shutdown().await?;
    if let Err(err) = task.await {
        warn!(error = %err, "session task failed");
    }
    drain(&mut events, &mut tally);

    Ok(SimulationReport {
        tracks_finished: tally.tracks_finished,
        skips_taken,
        skips_blocked,
        errors: tally.errors,
        timed_out,
        final_state,
    })
}

/// Log events until the queue has played out
async fn wait_for_end(events: &mut broadcast::Receiver<SessionEvent>, tally: &mut Tally) {
    loop {
        match events.recv().await {
            Ok(event) => {
                tally.record(&event);
                if let SessionEvent::StateChanged { status, .. } = event {
                    if matches!(status, PlaybackStatus::Ended | PlaybackStatus::Error) {
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>, tally: &mut Tally) {
    loop {
        match events.try_recv() {
            Ok(event) => tally.record(&event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                warn!(missed, "event log lagged");
            }
            Err(_) => return,
        }
    }
}
