//! Simulated media resource
//!
//! Stands in for a real player: each load spawns a tokio task that reports
//! metadata after a latency, then advances a playhead on a fixed tick while
//! the transport is playing and reports `ended` at the track's duration.
//! Reloading aborts the previous task.

use crate::config::SimulationSettings;
use cadence_session::{MediaEventSink, MediaFailure, MediaResource, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct Transport {
    playing: bool,
    position: f64,
}

pub struct SimulatedResource {
    settings: SimulationSettings,
    speed: f64,
    default_duration: f64,
    durations: HashMap<String, f64>,
    transport: Arc<Mutex<Transport>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedResource {
    /// `speed` is simulated seconds per wall-clock second
    pub fn new(settings: SimulationSettings, default_duration: f64, speed: f64) -> Self {
        Self {
            settings,
            speed,
            default_duration,
            durations: HashMap::new(),
            transport: Arc::new(Mutex::new(Transport::default())),
            task: None,
        }
    }

    /// Give one locator its own duration
    pub fn with_duration(mut self, url: impl Into<String>, seconds: f64) -> Self {
        self.durations.insert(url.into(), seconds);
        self
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SimulatedResource {
    fn drop(&mut self) {
        self.abort_task();
    }
}

fn lock(transport: &Mutex<Transport>) -> MutexGuard<'_, Transport> {
    transport.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MediaResource for SimulatedResource {
    fn load(&mut self, url: &str, events: MediaEventSink) -> Result<()> {
        self.abort_task();
        {
            let mut transport = lock(&self.transport);
            transport.playing = false;
            transport.position = 0.0;
        }

        let latency = Duration::from_millis(self.settings.load_latency_ms);
        let tick = Duration::from_millis(self.settings.tick_ms);
        let step = tick.as_secs_f64() * self.speed;
        let duration = self
            .durations
            .get(url)
            .copied()
            .unwrap_or(self.default_duration);
        let fails = self.settings.failing_urls.iter().any(|failing| failing == url);
        let transport = Arc::clone(&self.transport);
        let url = url.to_string();

        debug!(url = %url, generation = events.generation(), "simulated load");

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(latency).await;

            if fails {
                events.error(MediaFailure::Load(format!("cannot resolve {}", url)));
                return;
            }
            if !events.metadata(duration) {
                return;
            }

            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;

                let (position, finished) = {
                    let mut transport = lock(&transport);
                    if !transport.playing {
                        continue;
                    }
                    transport.position = (transport.position + step).min(duration);
                    let finished = transport.position >= duration;
                    if finished {
                        transport.playing = false;
                    }
                    (transport.position, finished)
                };

                trace!(position, "simulated tick");
                if !events.time_update(position) {
                    return;
                }
                if finished && !events.ended() {
                    return;
                }
            }
        }));

        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        lock(&self.transport).playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        lock(&self.transport).playing = false;
        Ok(())
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        lock(&self.transport).position = position;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        debug!(volume, "simulated volume");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.abort_task();
        let mut transport = lock(&self.transport);
        transport.playing = false;
        transport.position = 0.0;
        Ok(())
    }
}
