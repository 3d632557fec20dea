//! Simulated native engine
//!
//! A headless stand-in for the platform player. In manual mode every state
//! change is driven by the caller (tests); in simulated mode a background
//! clock prepares the item, grows the loaded range and advances the playhead.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::media::{ItemId, ItemOptions, MediaEngine, NativePlayer, NativeSignal, SignalSink};
use crate::types::{Failure, NativeStatus, TimeControl, TimeRange};

/// Calls made on a simulated player, in order
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    PlayImmediately(f32),
    Pause,
    Seek(f64),
    CancelPendingSeeks,
    Configure(ItemOptions),
    AddObserver,
    RemoveObservers,
}

/// Timing profile for simulated playback
#[derive(Debug, Clone, Copy)]
pub struct SimProfile {
    /// Media duration in seconds
    pub duration: f64,
    /// Time until the item reports ready
    pub prepare_delay: Duration,
    /// Seconds of media loaded per wall-clock second
    pub load_speed: f64,
    /// Clock resolution
    pub step: Duration,
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            duration: 60.0,
            prepare_delay: Duration::from_millis(300),
            load_speed: 4.0,
            step: Duration::from_millis(100),
        }
    }
}

#[derive(Debug)]
struct SimState {
    status: NativeStatus,
    failure: Option<Failure>,
    time_control: Option<TimeControl>,
    rate: f32,
    current: Option<f64>,
    duration: Option<f64>,
    loaded: Vec<TimeRange>,
    options: ItemOptions,
    sink: Option<SignalSink>,
    calls: Vec<NativeCall>,
    pending_seek: Option<f64>,
    auto_complete_seeks: bool,
}

/// Simulated player/item pair
#[derive(Debug)]
pub struct SimPlayer {
    id: ItemId,
    url: Option<Url>,
    state: Mutex<SimState>,
}

impl SimPlayer {
    /// Player driven entirely by the caller
    pub fn manual(duration: Option<f64>) -> Self {
        Self::build(None, duration, Some(TimeControl::Paused), false)
    }

    /// Player that only reports a rate, like engines without time control
    pub fn rate_only(duration: Option<f64>) -> Self {
        Self::build(None, duration, None, false)
    }

    fn build(
        url: Option<Url>,
        duration: Option<f64>,
        time_control: Option<TimeControl>,
        auto_complete_seeks: bool,
    ) -> Self {
        Self {
            id: ItemId::next(),
            url,
            state: Mutex::new(SimState {
                status: NativeStatus::Unknown,
                failure: None,
                time_control,
                rate: 0.0,
                current: Some(0.0),
                duration,
                loaded: Vec::new(),
                options: ItemOptions::default(),
                sink: None,
                calls: Vec::new(),
                pending_seek: None,
                auto_complete_seeks,
            }),
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Complete seeks as soon as they are issued
    pub fn set_auto_complete_seeks(&self, enabled: bool) {
        self.state.lock().auto_complete_seeks = enabled;
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().calls.clone()
    }

    /// Seek targets issued so far
    pub fn seeks(&self) -> Vec<f64> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                NativeCall::Seek(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &NativeCall) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn has_observer(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    pub fn options(&self) -> ItemOptions {
        self.state.lock().options
    }

    /// Deliver a raw signal to the observer, if any
    pub fn emit(&self, signal: NativeSignal) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.emit(signal);
        }
    }

    pub fn set_status(&self, status: NativeStatus) {
        self.state.lock().status = status;
        self.emit(NativeSignal::StatusChanged(status));
    }

    pub fn fail(&self, failure: Failure) {
        {
            let mut state = self.state.lock();
            state.status = NativeStatus::Failed;
            state.failure = Some(failure);
        }
        self.emit(NativeSignal::StatusChanged(NativeStatus::Failed));
    }

    pub fn set_time_control(&self, control: TimeControl) {
        {
            let mut state = self.state.lock();
            state.time_control = Some(control);
            state.rate = match control {
                TimeControl::Paused => 0.0,
                _ => 1.0,
            };
        }
        self.emit(NativeSignal::TimeControlChanged(control));
    }

    pub fn set_rate(&self, rate: f32) {
        self.state.lock().rate = rate;
        self.emit(NativeSignal::RateChanged(rate));
    }

    pub fn set_current(&self, seconds: f64) {
        self.state.lock().current = Some(seconds);
    }

    pub fn set_duration(&self, seconds: Option<f64>) {
        self.state.lock().duration = seconds;
    }

    pub fn set_loaded(&self, ranges: Vec<TimeRange>) {
        self.state.lock().loaded = ranges.clone();
        self.emit(NativeSignal::LoadedRangesChanged(ranges));
    }

    pub fn buffer_empty(&self) {
        self.emit(NativeSignal::PlaybackBufferEmpty(true));
    }

    pub fn likely_to_keep_up(&self) {
        self.emit(NativeSignal::PlaybackLikelyToKeepUp(true));
    }

    /// Play to the end and post the end notification for this item
    pub fn finish(&self) {
        {
            let mut state = self.state.lock();
            state.current = state.duration;
            state.rate = 0.0;
            if state.time_control.is_some() {
                state.time_control = Some(TimeControl::Paused);
            }
        }
        self.emit(NativeSignal::DidPlayToEnd(self.id));
    }

    /// Resolve the outstanding seek
    pub fn complete_seek(&self, finished: bool) {
        let target = self.state.lock().pending_seek.take();
        if let Some(target) = target {
            if finished {
                self.state.lock().current = Some(target);
            }
            self.emit(NativeSignal::SeekCompleted { finished });
        }
    }

    fn record(&self, call: NativeCall) {
        self.state.lock().calls.push(call);
    }

    fn playing_signal(&self, control: TimeControl, rate: f32) {
        let has_time_control = {
            let mut state = self.state.lock();
            state.rate = rate;
            if state.time_control.is_some() {
                state.time_control = Some(control);
                true
            } else {
                false
            }
        };
        if has_time_control {
            self.emit(NativeSignal::TimeControlChanged(control));
        } else {
            self.emit(NativeSignal::RateChanged(rate));
        }
    }

    /// Advance the simulated clock by `dt`
    fn advance(&self, elapsed: Duration, dt: f64, profile: &SimProfile) {
        let (status, control, current, loaded_end) = {
            let state = self.state.lock();
            let loaded_end = state.loaded.iter().map(TimeRange::end).fold(0.0, f64::max);
            (
                state.status,
                state.time_control,
                state.current.unwrap_or(0.0),
                loaded_end,
            )
        };

        if status == NativeStatus::Unknown && elapsed >= profile.prepare_delay {
            self.set_status(NativeStatus::ReadyToPlay);
            return;
        }
        if status != NativeStatus::ReadyToPlay {
            return;
        }

        if loaded_end < profile.duration {
            let end = (loaded_end + profile.load_speed * dt).min(profile.duration);
            self.set_loaded(vec![TimeRange::new(0.0, end)]);
        }
        let loaded_end = self
            .loaded_ranges()
            .iter()
            .map(TimeRange::end)
            .fold(0.0, f64::max);

        match control {
            Some(TimeControl::Playing) => {
                let next = current + dt;
                if next >= profile.duration {
                    self.finish();
                } else if next > loaded_end {
                    self.playing_signal(TimeControl::WaitingToPlayAtSpecifiedRate, 1.0);
                    self.buffer_empty();
                } else {
                    self.set_current(next);
                }
            }
            Some(TimeControl::WaitingToPlayAtSpecifiedRate) if loaded_end > current + 1.0 => {
                self.playing_signal(TimeControl::Playing, 1.0);
                self.likely_to_keep_up();
            }
            _ => {}
        }
    }
}

impl NativePlayer for SimPlayer {
    fn item_id(&self) -> ItemId {
        self.id
    }

    fn status(&self) -> NativeStatus {
        self.state.lock().status
    }

    fn failure(&self) -> Option<Failure> {
        self.state.lock().failure.clone()
    }

    fn time_control(&self) -> Option<TimeControl> {
        self.state.lock().time_control
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn current_time(&self) -> Option<f64> {
        self.state.lock().current
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn loaded_ranges(&self) -> Vec<TimeRange> {
        self.state.lock().loaded.clone()
    }

    fn play_immediately(&self, rate: f32) {
        self.record(NativeCall::PlayImmediately(rate));
        let control = if self.status() == NativeStatus::ReadyToPlay {
            TimeControl::Playing
        } else {
            TimeControl::WaitingToPlayAtSpecifiedRate
        };
        self.playing_signal(control, rate);
    }

    fn pause(&self) {
        self.record(NativeCall::Pause);
        self.playing_signal(TimeControl::Paused, 0.0);
    }

    fn seek(&self, to: f64) {
        self.record(NativeCall::Seek(to));
        let auto = {
            let mut state = self.state.lock();
            state.pending_seek = Some(to);
            state.auto_complete_seeks
        };
        if auto {
            self.complete_seek(true);
        }
    }

    fn cancel_pending_seeks(&self) {
        self.record(NativeCall::CancelPendingSeeks);
        self.complete_seek(false);
    }

    fn configure(&self, options: ItemOptions) {
        let mut state = self.state.lock();
        state.options = options;
        state.calls.push(NativeCall::Configure(options));
    }

    fn add_observer(&self, sink: SignalSink) {
        let mut state = self.state.lock();
        state.sink = Some(sink);
        state.calls.push(NativeCall::AddObserver);
    }

    fn remove_observers(&self) {
        let mut state = self.state.lock();
        state.sink = None;
        state.calls.push(NativeCall::RemoveObservers);
    }
}

/// Engine producing [`SimPlayer`]s
#[derive(Debug, Default)]
pub struct SimEngine {
    profile: Option<SimProfile>,
    opened: Mutex<Vec<Arc<SimPlayer>>>,
}

impl SimEngine {
    /// Players are driven by the caller
    pub fn manual() -> Self {
        Self::default()
    }

    /// Players run on a background clock
    pub fn simulated(profile: SimProfile) -> Self {
        Self {
            profile: Some(profile),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Players opened so far, oldest first
    pub fn opened(&self) -> Vec<Arc<SimPlayer>> {
        self.opened.lock().clone()
    }

    pub fn last_opened(&self) -> Option<Arc<SimPlayer>> {
        self.opened.lock().last().cloned()
    }
}

impl MediaEngine for SimEngine {
    fn open(&self, url: &Url, options: ItemOptions) -> Arc<dyn NativePlayer> {
        let player = match self.profile {
            Some(profile) => Arc::new(SimPlayer::build(
                Some(url.clone()),
                Some(profile.duration),
                Some(TimeControl::Paused),
                true,
            )),
            None => Arc::new(SimPlayer::build(
                Some(url.clone()),
                None,
                Some(TimeControl::Paused),
                false,
            )),
        };
        player.configure(options);
        self.opened.lock().push(Arc::clone(&player));

        if let Some(profile) = self.profile {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(drive(Arc::downgrade(&player), profile));
            }
        }

        debug!(item = %player.item_id(), url = %url, "Simulated item opened");
        player
    }
}

async fn drive(player: Weak<SimPlayer>, profile: SimProfile) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(profile.step);
    let dt = profile.step.as_secs_f64();
    loop {
        ticker.tick().await;
        let Some(player) = player.upgrade() else {
            break;
        };
        player.advance(started.elapsed(), dt, &profile);
    }
}
