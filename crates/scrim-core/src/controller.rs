//! Playback Controller - Status state machine over one media session
//!
//! Coordinates:
//! - Provider resolution (one in flight at a time)
//! - Session installation and teardown
//! - Play/pause commands and the delegate veto
//! - Seeks, parked until the session is ready

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::PlayerConfig;
use crate::media::{ItemId, ItemOptions, MediaHandle, NativePlayer};
use crate::provider::ResourceProvider;
use crate::runtime::{Inbox, Message};
use crate::session::{MediaSession, SessionId, SessionInput, SessionUpdate};
use crate::types::{Event, Failure, Status, TimeRange};
use crate::Result;

/// Outbound hooks for the owner of a player
pub trait PlayerDelegate: Send + Sync {
    /// Veto for play requests
    fn should_play(&self) -> bool {
        true
    }

    fn on_status(&self, _status: &Status) {}

    fn on_event(&self, _event: &Event) {}
}

/// Notification produced by the controller for its owner
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Status(Status),
    Loaded(Vec<TimeRange>),
    /// A new session was installed around this item
    Attached { item: ItemId },
}

/// In-flight provider resolution
struct Resolution {
    request: u64,
    seek_to: f64,
    task: JoinHandle<()>,
}

/// Playback controller owning at most one session
pub struct PlaybackController {
    provider: Arc<dyn ResourceProvider>,
    delegate: Option<Arc<dyn PlayerDelegate>>,
    inbox: Inbox,
    tick_interval: Duration,
    network_while_paused: bool,
    preferred_forward_buffer: f64,
    log_enabled: bool,
    session: Option<MediaSession>,
    resolution: Option<Resolution>,
    request_seq: u64,
    /// Last non-progress status
    status: Status,
    /// Last reported progress
    position: f64,
    paused_by_user: bool,
    /// Whether playback may start (the view is on screen)
    presentable: bool,
    /// Seek waiting for the session to become ready
    pending_seek: Option<f64>,
    seeks_in_flight: u32,
}

impl PlaybackController {
    pub fn new(config: &PlayerConfig, provider: Arc<dyn ResourceProvider>, inbox: Inbox) -> Self {
        provider.set_allows_cellular_access(config.allows_cellular_access);
        Self {
            provider,
            delegate: None,
            inbox,
            tick_interval: config.tick_interval(),
            network_while_paused: config.network_while_paused,
            preferred_forward_buffer: config.preferred_forward_buffer_secs,
            log_enabled: config.log_enabled,
            session: None,
            resolution: None,
            request_seq: 0,
            status: Status::Unknown,
            position: 0.0,
            paused_by_user: false,
            presentable: true,
            pending_seek: None,
            seeks_in_flight: 0,
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn PlayerDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn PlayerDelegate>>) {
        self.delegate = delegate;
    }

    pub fn delegate(&self) -> Option<&Arc<dyn PlayerDelegate>> {
        self.delegate.as_ref()
    }

    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    /// Last non-progress status
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Last reported playhead position in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    pub fn native(&self) -> Option<&Arc<dyn NativePlayer>> {
        self.session.as_ref().map(MediaSession::native)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_resolving(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn is_paused_by_user(&self) -> bool {
        self.paused_by_user
    }

    /// A seek is parked or has not completed yet
    pub fn is_seeking(&self) -> bool {
        self.pending_seek.is_some() || self.seeks_in_flight > 0
    }

    pub fn total(&mut self) -> Option<f64> {
        self.session.as_mut().and_then(MediaSession::total)
    }

    pub fn current(&self) -> Option<f64> {
        self.session.as_ref().map(MediaSession::current)
    }

    pub fn is_waiting_at_rate(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(MediaSession::is_waiting_at_rate)
    }

    /// Gate playback on the view being presentable
    pub fn set_presentable(&mut self, presentable: bool) {
        self.presentable = presentable;
    }

    pub fn is_presentable(&self) -> bool {
        self.presentable
    }

    /// Options applied to every installed item
    pub fn item_options(&self) -> ItemOptions {
        ItemOptions {
            allows_cellular_access: self.provider.allows_cellular_access(),
            network_while_paused: self.network_while_paused,
            preferred_forward_buffer: self.preferred_forward_buffer,
        }
    }

    /// Resolve a handle and play it, seeking to `seek_to` once ready
    #[instrument(skip(self))]
    pub fn play(&mut self, handle: MediaHandle, seek_to: f64) -> Vec<Update> {
        self.begin();

        self.request_seq += 1;
        let request = self.request_seq;
        let provider = Arc::clone(&self.provider);
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            let result = provider.resolve(&handle).await;
            let _ = inbox.send(Message::Resolved { request, result });
        });
        self.resolution = Some(Resolution {
            request,
            seek_to,
            task,
        });

        vec![self.set_status(Status::Loading)]
    }

    /// Play an already-resolved item
    #[instrument(skip(self, native), fields(item = %native.item_id()))]
    pub fn play_item(&mut self, native: Arc<dyn NativePlayer>, seek_to: f64) -> Vec<Update> {
        self.begin();
        let mut updates = vec![self.set_status(Status::Loading)];
        updates.extend(self.install(native, seek_to));
        updates
    }

    /// Completion of a provider resolution
    pub fn on_resolved(
        &mut self,
        request: u64,
        result: Result<Arc<dyn NativePlayer>>,
    ) -> Vec<Update> {
        let seek_to = match self.resolution.take() {
            Some(resolution) if resolution.request == request => resolution.seek_to,
            other => {
                self.resolution = other;
                debug!(request, "Dropping stale resolution");
                return Vec::new();
            }
        };

        match result {
            Ok(native) => self.install(native, seek_to),
            Err(err) => {
                warn!(error = %err, code = err.code(), "Resolution failed");
                self.teardown();
                vec![self.set_status(Status::Failed(Failure::from(&err)))]
            }
        }
    }

    /// Route input to the current session; stale sessions are ignored
    pub fn handle_session(&mut self, id: SessionId, input: SessionInput) -> Option<Update> {
        if self.session.as_ref().map(MediaSession::id) != Some(id) {
            return None;
        }
        let update = self.session.as_mut()?.handle(input)?;
        self.apply(update)
    }

    /// Handle a playback command
    #[instrument(skip(self))]
    pub fn send(&mut self, event: &Event) {
        match event {
            Event::Play => {
                if !self.allowed_to_play() {
                    return;
                }
                self.paused_by_user = false;
                self.resume_playback();
            }
            Event::Pause => {
                self.paused_by_user = true;
                self.pause_playback();
            }
            Event::Seek { time } => self.seek(*time),
            other => debug!(event = %other, "Not a playback command"),
        }
    }

    /// Seek with zero tolerance; parked until the session is ready
    #[instrument(skip(self))]
    pub fn seek(&mut self, to: f64) {
        let Some(session) = &self.session else {
            if self.resolution.is_some() {
                self.pending_seek = Some(to);
            } else {
                debug!("No session, seek dropped");
            }
            return;
        };
        if !session.is_ready() {
            debug!("Session not ready, seek parked");
            self.pending_seek = Some(to);
            return;
        }

        let native = session.native();
        if self.seeks_in_flight > 0 {
            native.cancel_pending_seeks();
        }
        native.seek(to);
        self.seeks_in_flight += 1;
        self.pending_seek = None;
    }

    /// Resume from the start if the item has finished, then play
    #[instrument(skip(self))]
    pub fn replay(&mut self) -> bool {
        if !self.allowed_to_play() {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let at_end = session
            .total()
            .is_some_and(|total| session.current() >= total);
        if self.status == Status::EndOfMedia || at_end {
            self.seek(0.0);
        }
        self.paused_by_user = false;
        self.resume_playback()
    }

    /// Tear down the session and report `stopped`
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Vec<Update> {
        self.cancel_resolution();
        self.teardown();
        self.paused_by_user = false;
        vec![self.set_status(Status::Stopped)]
    }

    /// Start native playback at full rate unless already playing
    pub fn resume_playback(&mut self) -> bool {
        if !self.presentable {
            debug!("Not presentable, play deferred");
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };
        if session.playback_status() != Status::Playing {
            session.native().play_immediately(1.0);
        }
        true
    }

    /// Pause native playback without recording a user pause
    pub fn pause_playback(&mut self) {
        if let Some(session) = &self.session {
            session.native().pause();
        }
    }

    /// Drop the session without reporting a status
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if self.seeks_in_flight > 0 {
                session.native().cancel_pending_seeks();
            }
            session.detach();
            self.log(&format!("Session {} torn down", session.id()));
        }
        self.pending_seek = None;
        self.seeks_in_flight = 0;
        self.position = 0.0;
    }

    fn begin(&mut self) {
        self.cancel_resolution();
        self.teardown();
        self.paused_by_user = false;
    }

    fn allowed_to_play(&self) -> bool {
        match &self.delegate {
            Some(delegate) if !delegate.should_play() => {
                warn!("Play vetoed by delegate");
                false
            }
            _ => true,
        }
    }

    fn cancel_resolution(&mut self) {
        if let Some(resolution) = self.resolution.take() {
            resolution.task.abort();
            debug!(request = resolution.request, "Resolution cancelled");
        }
        self.provider.cancel();
    }

    fn install(&mut self, native: Arc<dyn NativePlayer>, seek_to: f64) -> Vec<Update> {
        let mut updates = vec![self.set_status(Status::Waiting)];
        let seek_to = self.pending_seek.take().unwrap_or(seek_to);

        native.configure(self.item_options());
        let item = native.item_id();
        let mut session = MediaSession::new(native);
        let initial = session.attach(self.inbox.clone(), self.tick_interval);
        self.log(&format!("Session {} installed for {}", session.id(), item));
        self.session = Some(session);

        updates.push(Update::Attached { item });
        updates.extend(initial.into_iter().filter_map(|update| self.apply(update)));

        if !self.paused_by_user {
            if self.allowed_to_play() {
                self.resume_playback();
            }
            if seek_to > 0.0 {
                self.seek(seek_to);
            }
        }
        updates
    }

    fn apply(&mut self, update: SessionUpdate) -> Option<Update> {
        match update {
            SessionUpdate::Status(status) => {
                let ready = status == Status::Ready;
                let update = self.set_status(status);
                if ready {
                    if let Some(to) = self.pending_seek.take() {
                        self.seek(to);
                    }
                }
                Some(update)
            }
            SessionUpdate::Loaded(ranges) => Some(Update::Loaded(ranges)),
            SessionUpdate::SeekSettled { finished } => {
                self.seeks_in_flight = self.seeks_in_flight.saturating_sub(1);
                debug!(finished, "Seek settled");
                None
            }
        }
    }

    fn set_status(&mut self, status: Status) -> Update {
        match status {
            Status::Progress(seconds) => self.position = seconds,
            _ => {
                if status != self.status {
                    self.log(&format!("Status {} -> {}", self.status, status));
                }
                self.status = status.clone();
            }
        }
        Update::Status(status)
    }

    fn log(&self, message: &str) {
        if self.log_enabled {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.cancel_resolution();
        self.teardown();
    }
}
