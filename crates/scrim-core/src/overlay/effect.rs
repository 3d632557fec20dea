//! Blur layer covering the video until the first frame plays

use super::StateWidget;
use crate::types::{Event, Status};

#[derive(Debug, Clone)]
pub struct EffectLayer {
    enabled: bool,
    visible: bool,
    ready: bool,
    message: Option<String>,
}

impl EffectLayer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            visible: true,
            ready: false,
            message: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.enabled && self.visible
    }

    /// Failure text shown on top of the layer
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl StateWidget for EffectLayer {
    fn reset(&mut self) {
        self.visible = true;
        self.ready = false;
        self.message = None;
    }

    fn send(&mut self, _event: &Event) {}

    fn update(&mut self, status: &Status) {
        match status {
            Status::Unknown | Status::Loading | Status::Stopped => {
                self.visible = true;
                self.ready = false;
                self.message = None;
            }
            Status::Failed(failure) => {
                self.visible = true;
                self.message = Some(failure.message.clone());
            }
            Status::Ready => self.ready = true,
            Status::Progress(seconds) if self.ready && *seconds > 0.0 => self.visible = false,
            _ => {}
        }
    }
}
