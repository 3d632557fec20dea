//! Player runtime - the single-threaded event loop
//!
//! Every input to a player (commands, provider results, native signals,
//! progress ticks and timer firings) is a [`Message`] on one channel. A
//! single tokio task owns the [`PlayerView`] and handles messages in order,
//! so no player state is shared between tasks.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::binder::PlayerView;
use crate::config::PlayerConfig;
use crate::controller::PlayerDelegate;
use crate::media::{MediaHandle, NativePlayer};
use crate::overlay::{Control, ScrubAction, SoundEffects};
use crate::provider::ResourceProvider;
use crate::scheduler::TimerToken;
use crate::session::{SessionId, SessionInput};
use crate::types::{Event, Point, Status};
use crate::{Error, Result};

/// Sending half of a player's event loop
pub type Inbox = mpsc::UnboundedSender<Message>;

/// Event-loop input
#[derive(Debug)]
pub enum Message {
    /// Provider resolution finished
    Resolved {
        request: u64,
        result: Result<Arc<dyn NativePlayer>>,
    },
    /// Native signal or tick for a session
    Session {
        session: SessionId,
        input: SessionInput,
    },
    Timer(TimerToken),
    Command(Command),
}

/// Requests from the player's owner
#[derive(Debug)]
pub enum Command {
    Play { handle: MediaHandle, seek_to: f64 },
    PlayItem {
        item: Arc<dyn NativePlayer>,
        seek_to: f64,
    },
    Send(Event),
    UiEvent(Event),
    Press(Control),
    Scrub(ScrubAction),
    Reset,
    Replay,
    WindowAttached(bool),
    EnterBackground,
    BecomeActive,
    Shutdown,
}

/// Publishes delegate callbacks on channels, then forwards them
struct Broadcaster {
    status: watch::Sender<Status>,
    position: watch::Sender<f64>,
    events: broadcast::Sender<Event>,
    inner: Option<Arc<dyn PlayerDelegate>>,
}

impl PlayerDelegate for Broadcaster {
    fn should_play(&self) -> bool {
        self.inner.as_ref().map_or(true, |inner| inner.should_play())
    }

    fn on_status(&self, status: &Status) {
        match status {
            Status::Progress(seconds) => {
                self.position.send_replace(*seconds);
            }
            other => {
                self.status.send_replace(other.clone());
            }
        }
        if let Some(inner) = &self.inner {
            inner.on_status(status);
        }
    }

    fn on_event(&self, event: &Event) {
        let _ = self.events.send(event.clone());
        if let Some(inner) = &self.inner {
            inner.on_event(event);
        }
    }
}

/// Builder for a player running on its own task
pub struct PlayerRuntime {
    config: PlayerConfig,
    provider: Arc<dyn ResourceProvider>,
    delegate: Option<Arc<dyn PlayerDelegate>>,
    sounds: Option<Arc<dyn SoundEffects>>,
}

impl PlayerRuntime {
    pub fn new(config: PlayerConfig, provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            config,
            provider,
            delegate: None,
            sounds: None,
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn PlayerDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_sounds(mut self, sounds: Arc<dyn SoundEffects>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    /// Start the event loop on the current tokio runtime
    pub fn spawn(self) -> PlayerHandle {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(Status::Unknown);
        let (position_tx, position_rx) = watch::channel(0.0);
        let (events_tx, _) = broadcast::channel(64);

        let broadcaster = Arc::new(Broadcaster {
            status: status_tx,
            position: position_tx,
            events: events_tx.clone(),
            inner: self.delegate,
        });
        let mut view =
            PlayerView::new(self.config, self.provider, inbox.clone()).with_delegate(broadcaster);
        if let Some(sounds) = self.sounds {
            view = view.with_sounds(sounds);
        }

        let task = tokio::spawn(run(view, rx));
        PlayerHandle {
            inbox,
            status: status_rx,
            position: position_rx,
            events: events_tx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run(mut view: PlayerView, mut rx: mpsc::UnboundedReceiver<Message>) {
    info!("Player runtime started");
    while let Some(message) = rx.recv().await {
        if !view.dispatch(message) {
            break;
        }
    }
    view.reset();
    info!("Player runtime stopped");
}

/// Cloneable front end to a running player
#[derive(Clone)]
pub struct PlayerHandle {
    inbox: Inbox,
    status: watch::Receiver<Status>,
    position: watch::Receiver<f64>,
    events: broadcast::Sender<Event>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PlayerHandle {
    fn command(&self, command: Command) -> Result<()> {
        debug!(?command, "Queueing command");
        self.inbox
            .send(Message::Command(command))
            .map_err(|_| Error::Internal("player runtime has stopped".into()))
    }

    pub fn play(&self, handle: MediaHandle, seek_to: f64) -> Result<()> {
        self.command(Command::Play { handle, seek_to })
    }

    pub fn play_item(&self, item: Arc<dyn NativePlayer>, seek_to: f64) -> Result<()> {
        self.command(Command::PlayItem { item, seek_to })
    }

    pub fn send(&self, event: Event) -> Result<()> {
        self.command(Command::Send(event))
    }

    pub fn ui_event(&self, event: Event) -> Result<()> {
        self.command(Command::UiEvent(event))
    }

    pub fn press(&self, control: Control) -> Result<()> {
        self.command(Command::Press(control))
    }

    pub fn scrub(&self, action: ScrubAction) -> Result<()> {
        self.command(Command::Scrub(action))
    }

    pub fn tap(&self, point: Point, double: bool) -> Result<()> {
        let event = if double {
            Event::double_tap(point)
        } else {
            Event::single_tap(point)
        };
        self.ui_event(event)
    }

    pub fn reset(&self) -> Result<()> {
        self.command(Command::Reset)
    }

    pub fn replay(&self) -> Result<()> {
        self.command(Command::Replay)
    }

    pub fn window_attached(&self, attached: bool) -> Result<()> {
        self.command(Command::WindowAttached(attached))
    }

    pub fn app_did_enter_background(&self) -> Result<()> {
        self.command(Command::EnterBackground)
    }

    pub fn app_did_become_active(&self) -> Result<()> {
        self.command(Command::BecomeActive)
    }

    /// Status changes, excluding progress ticks
    pub fn status(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    pub fn current_status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Playhead position from progress ticks
    pub fn position(&self) -> watch::Receiver<f64> {
        self.position.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the event loop and wait for it to tear down
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.inbox.send(Message::Command(Command::Shutdown));
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|err| Error::Internal(format!("player runtime panicked: {}", err)))?;
        }
        Ok(())
    }
}
