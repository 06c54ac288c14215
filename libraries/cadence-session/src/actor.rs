//! Session actor
//!
//! Runs a [`PlaybackSession`] on its own task. Intents from any number of
//! [`SessionHandle`] clones and events from the media resource are funnelled
//! through one `select!` loop, so the session never sees concurrent mutation.

use crate::{
    adapter::AdapterEvent,
    error::{PlaybackError, Result},
    events::{SessionEvent, SessionSnapshot},
    session::PlaybackSession,
    types::{LoopMode, SkipOutcome, Track},
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Job = Box<dyn FnOnce(&mut PlaybackSession) + Send>;

enum SessionCommand {
    Run(Job),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running session
///
/// Cheap to clone. Every method waits for the session to apply the intent
/// and returns its result; once the actor is gone they fail with
/// [`PlaybackError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Move `session` onto a new task
    ///
    /// `media_events` is the receiver returned by
    /// [`crate::MediaResourceAdapter::new`] for the adapter inside `session`.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        session: PlaybackSession,
        media_events: mpsc::UnboundedReceiver<AdapterEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(session.config().command_capacity);
        let handle = Self {
            id: session.id(),
            commands: commands_tx,
            events: session.event_sender(),
        };

        let task = tokio::spawn(run(session, commands_rx, media_events));
        (handle, task)
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Run a closure against the session on its task
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut PlaybackSession) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |session| {
            let _ = reply_tx.send(f(session));
        });

        self.commands
            .send(SessionCommand::Run(job))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        reply_rx.await.map_err(|_| PlaybackError::SessionClosed)
    }

    // ===== Intents =====

    pub async fn play(&self, track: Track) -> Result<()> {
        self.call(move |s| s.play(track)).await?
    }

    pub async fn resume(&self) -> Result<()> {
        self.call(PlaybackSession::resume).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.call(PlaybackSession::pause).await?
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.call(PlaybackSession::toggle_play_pause).await?
    }

    pub async fn next(&self) -> Result<SkipOutcome> {
        self.call(PlaybackSession::next).await?
    }

    pub async fn previous(&self) -> Result<SkipOutcome> {
        self.call(PlaybackSession::previous).await?
    }

    pub async fn play_at(&self, index: usize) -> Result<()> {
        self.call(move |s| s.play_at(index)).await?
    }

    pub async fn seek(&self, seconds: f64) -> Result<()> {
        self.call(move |s| s.seek(seconds)).await?
    }

    pub async fn seek_percent(&self, fraction: f64) -> Result<()> {
        self.call(move |s| s.seek_percent(fraction)).await?
    }

    pub async fn set_volume(&self, level: f32) -> Result<()> {
        self.call(move |s| s.set_volume(level)).await?
    }

    pub async fn mute(&self) -> Result<()> {
        self.call(PlaybackSession::mute).await?
    }

    pub async fn unmute(&self) -> Result<()> {
        self.call(PlaybackSession::unmute).await?
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.call(PlaybackSession::toggle_mute).await?
    }

    pub async fn add_to_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.call(move |s| s.add_to_queue(tracks)).await?
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.call(PlaybackSession::clear_queue).await
    }

    pub async fn remove_from_queue(&self, index: usize) -> Result<Track> {
        self.call(move |s| s.remove_from_queue(index)).await?
    }

    pub async fn toggle_loop(&self) -> Result<LoopMode> {
        self.call(PlaybackSession::toggle_loop).await
    }

    /// Reset the session; the actor keeps running
    pub async fn end_session(&self) -> Result<()> {
        self.call(PlaybackSession::end_session).await?
    }

    /// Current observable state
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.call(|s| s.snapshot()).await
    }

    /// End the session and stop the actor
    pub async fn shutdown(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown(done_tx))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        done_rx.await.map_err(|_| PlaybackError::SessionClosed)
    }
}

async fn run(
    mut session: PlaybackSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut media_events: mpsc::UnboundedReceiver<AdapterEvent>,
) {
    info!(session = %session.id(), "session actor started");

    let done = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Run(job)) => job(&mut session),
                Some(SessionCommand::Shutdown(done)) => break Some(done),
                None => {
                    debug!(session = %session.id(), "all handles dropped");
                    break None;
                }
            },
            Some(event) = media_events.recv() => session.handle_adapter_event(event),
        }
    };

    if let Err(err) = session.end_session() {
        warn!(session = %session.id(), error = %err, "error while ending session");
    }
    info!(session = %session.id(), "session actor stopped");

    if let Some(done) = done {
        let _ = done.send(());
    }
}
