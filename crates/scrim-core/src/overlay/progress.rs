//! Progress bar with play, zoom and next buttons

use serde::{Deserialize, Serialize};

use super::{Control, StateWidget};
use crate::config::ProgressControls;
use crate::types::{Event, MaskAction, Status, TimeRange, ZoomAction};

/// Scrubbing gesture on the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "fraction", rename_all = "snake_case")]
pub enum ScrubAction {
    Began,
    /// Fraction of the total duration, 0.0 to 1.0
    Progress(f64),
    Ended,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProgressBar {
    enabled: bool,
    controls: ProgressControls,
    shown: bool,
    /// Zero while unknown
    total: f64,
    current: f64,
    loaded: Vec<TimeRange>,
    playing: bool,
    zoom: ZoomAction,
    pannable_status: bool,
    /// Last status was one the bar may be drawn for
    status_visible: bool,
}

impl ProgressBar {
    pub fn new(enabled: bool, controls: ProgressControls) -> Self {
        Self {
            enabled,
            controls,
            shown: false,
            total: 0.0,
            current: 0.0,
            loaded: Vec::new(),
            playing: false,
            zoom: ZoomAction::Out,
            pannable_status: false,
            status_visible: false,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.enabled && self.shown && self.status_visible
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn set_total(&mut self, total: f64) {
        if total.is_finite() && total >= 0.0 {
            self.total = total;
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn set_progress(&mut self, current: f64, total: Option<f64>) {
        self.current = current;
        if let Some(total) = total {
            self.set_total(total);
        }
    }

    pub fn loaded(&self) -> &[TimeRange] {
        &self.loaded
    }

    pub fn set_loaded(&mut self, ranges: Vec<TimeRange>) {
        self.loaded = ranges;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn zoom(&self) -> ZoomAction {
        self.zoom
    }

    pub fn controls(&self) -> ProgressControls {
        self.controls
    }

    pub fn is_pan_enabled(&self) -> bool {
        self.pannable_status && self.total > 0.0 && self.controls.pan
    }

    /// Button press; `None` when the control is disabled
    pub fn press(&self, control: Control) -> Option<Event> {
        match control {
            Control::Play if self.controls.play => Some(if self.playing {
                Event::Pause
            } else {
                Event::Play
            }),
            Control::Zoom if self.controls.zoom => Some(Event::zoom(self.zoom.inverse(), true)),
            Control::Next if self.controls.next => Some(Event::Next),
            _ => None,
        }
    }

    /// Mask change and optional seek for a scrub gesture
    pub fn scrub(&mut self, action: ScrubAction) -> Option<(MaskAction, Option<Event>)> {
        if !self.is_pan_enabled() {
            return None;
        }
        Some(match action {
            ScrubAction::Began => (MaskAction::Show, None),
            ScrubAction::Progress(fraction) => {
                let time = self.total * fraction.clamp(0.0, 1.0);
                self.current = time;
                (MaskAction::Show, Some(Event::seek(time)))
            }
            ScrubAction::Ended | ScrubAction::Cancelled => (MaskAction::Flash, None),
        })
    }
}

impl StateWidget for ProgressBar {
    fn reset(&mut self) {
        self.shown = false;
        self.total = 0.0;
        self.current = 0.0;
        self.loaded.clear();
        self.playing = false;
        self.pannable_status = false;
        self.status_visible = false;
    }

    fn send(&mut self, event: &Event) {
        match event {
            Event::Mask { action, .. } => self.shown = *action != MaskAction::Hide,
            Event::Zoom { action, .. } => self.zoom = *action,
            _ => {}
        }
    }

    fn update(&mut self, status: &Status) {
        match status {
            Status::Unknown | Status::Paused | Status::Failed(_) | Status::EndOfMedia => {
                self.playing = false
            }
            Status::Playing | Status::Waiting | Status::BufferEmpty => self.playing = true,
            _ => {}
        }
        self.pannable_status = !matches!(
            status,
            Status::Unknown | Status::Loading | Status::Failed(_)
        );
        self.status_visible = status.is_visible();
    }
}
