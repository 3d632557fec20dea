//! Presentation Binder - environment and UI policy over the controller
//!
//! Routes controller updates to the overlay widgets and the delegate, and
//! layers the view's policies on top:
//! - window attach/detach with a short grace period before pausing
//! - background/foreground transitions
//! - resume after enough data is buffered ahead of the playhead
//! - retry of the last handle after a failure
//! - overlay auto-hide

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::PlayerConfig;
use crate::controller::{PlaybackController, PlayerDelegate, Update};
use crate::media::{MediaHandle, NativePlayer};
use crate::overlay::{Control, Overlay, ScrubAction, SoundEffects};
use crate::provider::ResourceProvider;
use crate::runtime::{Command, Inbox, Message};
use crate::scheduler::{Scheduler, TimerKind, TimerToken};
use crate::types::{Event, MaskAction, Status, TimeRange, VideoGravity};

/// Whether a stalled player has enough data buffered ahead to resume
pub fn should_resume(current: f64, ranges: &[TimeRange], lookahead: f64) -> bool {
    current > lookahead && ranges.iter().any(|range| range.covers(current, lookahead))
}

/// One player view: controller, overlay and environment state
pub struct PlayerView {
    config: PlayerConfig,
    controller: PlaybackController,
    overlay: Overlay,
    scheduler: Scheduler,
    delegate: Option<Arc<dyn PlayerDelegate>>,
    /// Handle replayed by a retry
    last_handle: Option<MediaHandle>,
    /// Last play/pause command from the user
    last_command: Option<Event>,
    /// Paused because the view left its window
    paused_by_env: bool,
    in_window: bool,
    gravity: VideoGravity,
}

impl PlayerView {
    pub fn new(config: PlayerConfig, provider: Arc<dyn ResourceProvider>, inbox: Inbox) -> Self {
        let controller = PlaybackController::new(&config, provider, inbox.clone());
        let overlay = Overlay::new(config.overlay, config.controls);
        Self {
            controller,
            overlay,
            scheduler: Scheduler::new(inbox),
            delegate: None,
            last_handle: None,
            last_command: None,
            paused_by_env: false,
            in_window: true,
            gravity: VideoGravity::default(),
            config,
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn PlayerDelegate>) -> Self {
        self.controller.set_delegate(Some(Arc::clone(&delegate)));
        self.delegate = Some(delegate);
        self
    }

    pub fn with_sounds(mut self, sounds: Arc<dyn SoundEffects>) -> Self {
        self.overlay = self.overlay.with_sounds(sounds);
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut Overlay {
        &mut self.overlay
    }

    pub fn status(&self) -> &Status {
        self.controller.status()
    }

    pub fn last_command(&self) -> Option<&Event> {
        self.last_command.as_ref()
    }

    pub fn is_paused_by_env(&self) -> bool {
        self.paused_by_env
    }

    pub fn is_in_window(&self) -> bool {
        self.in_window
    }

    pub fn video_gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn is_timer_pending(&self, kind: TimerKind) -> bool {
        self.scheduler.is_pending(kind)
    }

    /// Handle one event-loop message; false on shutdown
    pub fn dispatch(&mut self, message: Message) -> bool {
        match message {
            Message::Resolved { request, result } => {
                let updates = self.controller.on_resolved(request, result);
                self.apply(updates);
            }
            Message::Session { session, input } => {
                let update = self.controller.handle_session(session, input);
                self.apply(update);
            }
            Message::Timer(token) => self.on_timer(token),
            Message::Command(Command::Shutdown) => return false,
            Message::Command(command) => self.execute(command),
        }
        true
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Play { handle, seek_to } => self.play(handle, seek_to),
            Command::PlayItem { item, seek_to } => self.play_item(item, seek_to),
            Command::Send(event) => self.send(event),
            Command::UiEvent(event) => self.ui_event(event),
            Command::Press(control) => self.press(control),
            Command::Scrub(action) => self.scrub(action),
            Command::Reset => self.reset(),
            Command::Replay => self.replay(),
            Command::WindowAttached(attached) => self.window_attached(attached),
            Command::EnterBackground => self.app_did_enter_background(),
            Command::BecomeActive => self.app_did_become_active(),
            Command::Shutdown => {}
        }
    }

    /// Resolve and play a handle, remembering it for retries
    #[instrument(skip(self))]
    pub fn play(&mut self, handle: MediaHandle, seek_to: f64) {
        self.begin();
        self.last_handle = Some(handle.clone());
        let updates = self.controller.play(handle, seek_to);
        self.apply(updates);
    }

    #[instrument(skip(self, item), fields(item = %item.item_id()))]
    pub fn play_item(&mut self, item: Arc<dyn NativePlayer>, seek_to: f64) {
        self.begin();
        self.last_handle = None;
        let updates = self.controller.play_item(item, seek_to);
        self.apply(updates);
    }

    fn begin(&mut self) {
        self.scheduler.cancel(TimerKind::DeferredPause);
        self.paused_by_env = false;
        self.last_command = Some(Event::Play);
        self.overlay.reset();
        self.apply_mask(MaskAction::Flash);
    }

    /// Apply a command from the view's owner
    #[instrument(skip(self))]
    pub fn send(&mut self, event: Event) {
        self.handle_event(&event, false);
    }

    /// Apply an event raised by the overlay and forward it to the delegate
    #[instrument(skip(self))]
    pub fn ui_event(&mut self, event: Event) {
        let handled = self.handle_event(&event, true);
        if handled && !matches!(event, Event::Mask { .. }) {
            self.notify_event(&event);
        }
    }

    /// Overlay seeks need a known total; owner seeks are parked by the controller
    fn handle_event(&mut self, event: &Event, from_ui: bool) -> bool {
        match event {
            Event::Play => {
                if !self.controller.has_session() && !self.controller.is_resolving() {
                    if let Some(handle) = self.last_handle.clone() {
                        info!(%handle, "Retrying last handle");
                        self.play(handle, 0.0);
                        return true;
                    }
                }
                self.last_command = Some(Event::Play);
                self.paused_by_env = false;
                self.overlay.send(event);
                self.controller.send(event);
            }
            Event::Pause => {
                self.last_command = Some(Event::Pause);
                self.overlay.send(event);
                self.controller.send(event);
            }
            Event::Seek { time } => {
                let total = self.controller.total().filter(|total| *total > 0.0);
                if from_ui && total.is_none() {
                    debug!("Total unknown, seek ignored");
                    return false;
                }
                self.overlay.progress_mut().set_progress(*time, total);
                self.controller.seek(*time);
            }
            Event::Zoom { action, .. } => {
                self.gravity = VideoGravity::from(*action);
                self.overlay.send(event);
            }
            Event::SingleTap { .. } | Event::DoubleTap { .. } => {
                if let Some(action) = self.overlay.tap(event) {
                    self.apply_mask(action);
                }
            }
            Event::Mask { action, .. } => self.apply_mask(*action),
            Event::Exit | Event::Next => self.overlay.send(event),
        }
        true
    }

    /// Overlay button press: flash the overlay and apply the button's event
    pub fn press(&mut self, control: Control) {
        if let Some(event) = self.overlay.press(control) {
            self.apply_mask(MaskAction::Flash);
            self.ui_event(event);
        }
    }

    /// Progress-bar scrub gesture
    pub fn scrub(&mut self, action: ScrubAction) {
        if let Some((mask, seek)) = self.overlay.scrub(action) {
            self.apply_mask(mask);
            if let Some(seek) = seek {
                self.ui_event(seek);
            }
        }
    }

    /// Play again from the start if finished; re-resolves after a failure
    #[instrument(skip(self))]
    pub fn replay(&mut self) {
        if self.controller.is_resolving() {
            debug!("Resolution in flight, replay ignored");
            return;
        }
        if !self.controller.has_session() {
            if let Some(handle) = self.last_handle.clone() {
                self.play(handle, 0.0);
            }
            return;
        }
        if self.controller.replay() {
            self.last_command = Some(Event::Play);
        }
    }

    /// Tear down playback and clear the overlay
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.scheduler.cancel_all();
        let updates = self.controller.reset();
        self.apply(updates);
        self.overlay.reset();
        self.last_command = None;
        self.paused_by_env = false;
    }

    /// The view entered or left the window hierarchy
    #[instrument(skip(self))]
    pub fn window_attached(&mut self, attached: bool) {
        self.in_window = attached;
        self.controller
            .set_presentable(attached || self.config.plays_without_window);

        if attached {
            self.scheduler.cancel(TimerKind::DeferredPause);
            if self.paused_by_env || self.last_command == Some(Event::Play) {
                self.paused_by_env = false;
                self.controller.send(&Event::Play);
            }
        } else if !self.config.plays_without_window && self.last_command != Some(Event::Pause) {
            self.scheduler
                .schedule(TimerKind::DeferredPause, self.config.detach_grace());
        }
    }

    #[instrument(skip(self))]
    pub fn app_did_enter_background(&mut self) {
        self.controller.pause_playback();
    }

    #[instrument(skip(self))]
    pub fn app_did_become_active(&mut self) {
        if self.last_command == Some(Event::Play) && *self.controller.status() != Status::EndOfMedia
        {
            self.controller.send(&Event::Play);
        }
    }

    fn on_timer(&mut self, token: TimerToken) {
        if !self.scheduler.fire(token) {
            return;
        }
        match token.kind {
            TimerKind::AutoHide => {
                let event = self.overlay.mask(MaskAction::Hide);
                self.notify_event(&event);
            }
            TimerKind::DeferredPause => {
                if self.in_window {
                    return;
                }
                info!("View left its window, pausing");
                self.paused_by_env = true;
                self.controller.send(&Event::Pause);
            }
        }
    }

    fn apply_mask(&mut self, action: MaskAction) {
        self.scheduler.cancel(TimerKind::AutoHide);
        let event = self.overlay.mask(action);
        if action == MaskAction::Flash {
            self.scheduler
                .schedule(TimerKind::AutoHide, self.config.auto_hide_delay());
        }
        self.notify_event(&event);
    }

    fn apply(&mut self, updates: impl IntoIterator<Item = Update>) {
        for update in updates {
            match update {
                Update::Status(status) => self.on_status(status),
                Update::Loaded(ranges) => self.on_loaded(ranges),
                Update::Attached { item } => {
                    debug!(%item, "Item attached");
                    if let Some(total) = self.controller.total() {
                        self.overlay.progress_mut().set_total(total);
                    }
                }
            }
        }
    }

    fn on_status(&mut self, status: Status) {
        self.overlay.update(&status);
        match &status {
            Status::Progress(seconds) => {
                if !self.controller.is_seeking() {
                    let total = self.controller.total();
                    self.overlay.progress_mut().set_progress(*seconds, total);
                }
            }
            Status::Failed(failure) => {
                warn!(code = failure.code, message = %failure.message, "Playback failed");
                self.controller.teardown();
                self.controller.provider().cancel();
            }
            Status::BufferEmpty => self.controller.pause_playback(),
            Status::EndOfMedia => self.apply_mask(MaskAction::Show),
            _ => {}
        }
        if let Some(delegate) = &self.delegate {
            delegate.on_status(&status);
        }
    }

    fn on_loaded(&mut self, ranges: Vec<TimeRange>) {
        let total = self.controller.total();
        let bar = self.overlay.progress_mut();
        if bar.total() <= 0.0 {
            if let Some(total) = total {
                bar.set_total(total);
            }
        }
        bar.set_loaded(ranges.clone());

        if !self.controller.is_waiting_at_rate() {
            return;
        }
        let current = self.controller.current().unwrap_or(0.0);
        if should_resume(current, &ranges, self.config.minimum_lookahead_secs) {
            info!(current, "Buffered ahead, resuming stalled playback");
            if self.controller.replay() {
                self.last_command = Some(Event::Play);
            }
        }
    }

    fn notify_event(&self, event: &Event) {
        if let Some(delegate) = &self.delegate {
            delegate.on_event(event);
        }
    }
}
