//! Media Session - one native player/item pair
//!
//! Observes the native player and normalizes its signals:
//! - readiness → `ready` / `unknown` / `failed`
//! - time control (or raw rate) → `paused` / `waiting` / `playing`
//! - periodic ticks → `progress`
//! - buffer signals → `bufferEmpty` / `likelyToKeepUp`
//! - end notifications for this item → `endOfMedia`
//! - loaded ranges → a separate `loaded` update

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::media::{NativePlayer, NativeSignal, SignalSink};
use crate::runtime::{Inbox, Message};
use crate::types::{valid_ranges, NativeStatus, Status, TimeRange};

/// Unique identifier for a media session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input routed to a session by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Signal(NativeSignal),
    Tick,
}

/// What a session reports to its listener
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(Status),
    Loaded(Vec<TimeRange>),
    /// A seek finished or was superseded
    SeekSettled { finished: bool },
}

/// Session wrapping one resolved native player
#[derive(Debug)]
pub struct MediaSession {
    /// Unique session ID
    id: SessionId,
    /// Native player/item pair
    native: Arc<dyn NativePlayer>,
    /// Last emitted status; may be polled from other threads
    status: Arc<Mutex<Status>>,
    /// Duration, cached once positive
    total: Option<f64>,
    /// Last loaded ranges
    loaded: Vec<TimeRange>,
    /// Periodic tick task while attached
    ticker: Option<JoinHandle<()>>,
    attached: bool,
}

impl MediaSession {
    /// Wrap a native player; nothing is observed until [`attach`](Self::attach)
    pub fn new(native: Arc<dyn NativePlayer>) -> Self {
        Self {
            id: SessionId::new(),
            native,
            status: Arc::new(Mutex::new(Status::Unknown)),
            total: None,
            loaded: Vec::new(),
            ticker: None,
            attached: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn native(&self) -> &Arc<dyn NativePlayer> {
        &self.native
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status.lock().clone()
    }

    /// Shared status cell for readers off the event loop
    pub fn status_handle(&self) -> Arc<Mutex<Status>> {
        Arc::clone(&self.status)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_ready(&self) -> bool {
        self.native.status() == NativeStatus::ReadyToPlay
    }

    /// Playback state from time control, or from the rate on engines without it
    pub fn playback_status(&self) -> Status {
        match self.native.time_control() {
            Some(control) => Status::from_time_control(control),
            None => Status::from_rate(self.native.rate()),
        }
    }

    /// Ready, but holding at the requested rate until more data arrives
    pub fn is_waiting_at_rate(&self) -> bool {
        self.is_ready() && self.playback_status() == Status::Waiting
    }

    /// Playhead in seconds
    pub fn current(&self) -> f64 {
        self.native.current_time().unwrap_or(0.0)
    }

    /// Item duration, looked up until the engine reports a positive value
    pub fn total(&mut self) -> Option<f64> {
        if let Some(total) = self.total.filter(|t| *t > 0.0) {
            return Some(total);
        }
        self.total = self.native.duration().filter(|t| t.is_finite());
        self.total
    }

    pub fn loaded(&self) -> &[TimeRange] {
        &self.loaded
    }

    /// Start observing and report the current native state right away
    pub fn attach(&mut self, inbox: Inbox, tick_interval: Duration) -> Vec<SessionUpdate> {
        if self.attached {
            return Vec::new();
        }
        self.attached = true;

        let mut updates = Vec::new();
        let loaded = valid_ranges(&self.native.loaded_ranges());
        if !loaded.is_empty() {
            self.loaded = loaded.clone();
            updates.push(SessionUpdate::Loaded(loaded));
        }

        self.native.add_observer(SignalSink::new(self.id, inbox.clone()));
        self.ticker = Some(spawn_ticker(self.id, inbox, tick_interval));

        updates.push(self.set_status(Status::from_native(
            self.native.status(),
            self.native.failure(),
        )));
        let playback = self.playback_status();
        updates.push(self.set_status(playback));

        debug!(session = %self.id, item = %self.native.item_id(), "Session attached");
        updates
    }

    /// Stop observing; safe to call more than once
    pub fn detach(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if self.attached {
            self.native.remove_observers();
            self.attached = false;
            debug!(session = %self.id, "Session detached");
        }
    }

    /// Translate one input into at most one update
    pub fn handle(&mut self, input: SessionInput) -> Option<SessionUpdate> {
        if !self.attached {
            return None;
        }
        match input {
            SessionInput::Tick => {
                if !self.is_ready() {
                    return None;
                }
                let current = self.current();
                Some(self.set_status(Status::Progress(current)))
            }
            SessionInput::Signal(signal) => self.handle_signal(signal),
        }
    }

    fn handle_signal(&mut self, signal: NativeSignal) -> Option<SessionUpdate> {
        trace!(session = %self.id, ?signal, "Native signal");
        match signal {
            NativeSignal::StatusChanged(status) => {
                let failure = match status {
                    NativeStatus::Failed => self.native.failure(),
                    _ => None,
                };
                Some(self.set_status(Status::from_native(status, failure)))
            }
            NativeSignal::TimeControlChanged(control) => {
                Some(self.set_status(Status::from_time_control(control)))
            }
            NativeSignal::RateChanged(rate) => Some(self.set_status(Status::from_rate(rate))),
            NativeSignal::LoadedRangesChanged(ranges) => {
                self.loaded = valid_ranges(&ranges);
                Some(SessionUpdate::Loaded(self.loaded.clone()))
            }
            NativeSignal::PlaybackBufferEmpty(empty) => {
                // Buffer-empty while already at rate 1.0 is startup noise
                if !empty || self.native.rate() == 1.0 {
                    return None;
                }
                Some(self.set_status(Status::BufferEmpty))
            }
            NativeSignal::PlaybackLikelyToKeepUp(likely) => {
                likely.then(|| self.set_status(Status::LikelyToKeepUp))
            }
            NativeSignal::DidPlayToEnd(item) => {
                if item != self.native.item_id() {
                    return None;
                }
                Some(self.set_status(Status::EndOfMedia))
            }
            NativeSignal::SeekCompleted { finished } => {
                Some(SessionUpdate::SeekSettled { finished })
            }
        }
    }

    fn set_status(&mut self, status: Status) -> SessionUpdate {
        *self.status.lock() = status.clone();
        SessionUpdate::Status(status)
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.detach();
    }
}

fn spawn_ticker(session: SessionId, inbox: Inbox, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sent = inbox.send(Message::Session {
                session,
                input: SessionInput::Tick,
            });
            if sent.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ItemId;
    use crate::sim::{NativeCall, SimPlayer};
    use crate::types::{Failure, TimeControl};
    use tokio::sync::mpsc;

    fn session_with(player: Arc<SimPlayer>) -> (MediaSession, mpsc::UnboundedReceiver<Message>, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MediaSession::new(player), rx, tx)
    }

    #[tokio::test]
    async fn test_attach_reports_current_state() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        player.set_status(NativeStatus::ReadyToPlay);
        let (mut session, _rx, inbox) = session_with(player.clone());

        let updates = session.attach(inbox, Duration::from_millis(33));
        assert_eq!(
            updates,
            vec![
                SessionUpdate::Status(Status::Ready),
                SessionUpdate::Status(Status::Paused),
            ]
        );
        assert!(player.has_observer());
        assert_eq!(session.status(), Status::Paused);
    }

    #[tokio::test]
    async fn test_detach_removes_observers() {
        let player = Arc::new(SimPlayer::manual(None));
        let (mut session, _rx, inbox) = session_with(player.clone());
        session.attach(inbox, Duration::from_millis(33));
        drop(session);

        assert!(!player.has_observer());
        assert_eq!(player.count(&NativeCall::RemoveObservers), 1);
    }

    #[tokio::test]
    async fn test_signal_mapping() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        let (mut session, _rx, inbox) = session_with(player.clone());
        session.attach(inbox, Duration::from_millis(33));

        let update = session.handle(SessionInput::Signal(NativeSignal::TimeControlChanged(
            TimeControl::WaitingToPlayAtSpecifiedRate,
        )));
        assert_eq!(update, Some(SessionUpdate::Status(Status::Waiting)));

        player.fail(Failure::new(-11800, "decoder error"));
        let update = session.handle(SessionInput::Signal(NativeSignal::StatusChanged(
            NativeStatus::Failed,
        )));
        assert_eq!(
            update,
            Some(SessionUpdate::Status(Status::Failed(Failure::new(-11800, ""))))
        );
    }

    #[tokio::test]
    async fn test_buffer_empty_at_full_rate_is_ignored() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        let (mut session, _rx, inbox) = session_with(player.clone());
        session.attach(inbox, Duration::from_millis(33));

        player.set_rate(1.0);
        let signal = SessionInput::Signal(NativeSignal::PlaybackBufferEmpty(true));
        assert_eq!(session.handle(signal.clone()), None);

        player.set_rate(0.0);
        assert_eq!(
            session.handle(signal),
            Some(SessionUpdate::Status(Status::BufferEmpty))
        );
    }

    #[tokio::test]
    async fn test_end_notification_for_other_item_is_ignored() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        let (mut session, _rx, inbox) = session_with(player.clone());
        session.attach(inbox, Duration::from_millis(33));

        let foreign = SessionInput::Signal(NativeSignal::DidPlayToEnd(ItemId::next()));
        assert_eq!(session.handle(foreign), None);

        let own = SessionInput::Signal(NativeSignal::DidPlayToEnd(player.item_id()));
        assert_eq!(
            session.handle(own),
            Some(SessionUpdate::Status(Status::EndOfMedia))
        );
    }

    #[tokio::test]
    async fn test_progress_only_when_ready() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        let (mut session, _rx, inbox) = session_with(player.clone());
        session.attach(inbox, Duration::from_millis(33));

        assert_eq!(session.handle(SessionInput::Tick), None);

        player.set_status(NativeStatus::ReadyToPlay);
        player.set_current(12.5);
        assert_eq!(
            session.handle(SessionInput::Tick),
            Some(SessionUpdate::Status(Status::Progress(12.5)))
        );
    }

    #[tokio::test]
    async fn test_total_is_cached_once_positive() {
        let player = Arc::new(SimPlayer::manual(None));
        let mut session = MediaSession::new(player.clone());
        assert_eq!(session.total(), None);

        player.set_duration(Some(90.0));
        assert_eq!(session.total(), Some(90.0));

        player.set_duration(Some(f64::NAN));
        assert_eq!(session.total(), Some(90.0));
    }

    #[tokio::test]
    async fn test_rate_only_engine() {
        let player = Arc::new(SimPlayer::rate_only(Some(30.0)));
        let (mut session, _rx, inbox) = session_with(player.clone());
        let updates = session.attach(inbox, Duration::from_millis(33));
        assert_eq!(updates.last(), Some(&SessionUpdate::Status(Status::Paused)));

        let update = session.handle(SessionInput::Signal(NativeSignal::RateChanged(0.5)));
        assert_eq!(update, Some(SessionUpdate::Status(Status::Waiting)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_posts_ticks() {
        let player = Arc::new(SimPlayer::manual(Some(30.0)));
        let (mut session, mut rx, inbox) = session_with(player);
        session.attach(inbox, Duration::from_millis(33));

        let message = rx.recv().await.unwrap();
        assert!(matches!(
            message,
            Message::Session { input: SessionInput::Tick, .. }
        ));
    }
}
