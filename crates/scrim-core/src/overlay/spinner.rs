//! Activity indicator

use super::StateWidget;
use crate::types::{Event, Status};

#[derive(Debug, Clone)]
pub struct Spinner {
    enabled: bool,
    animating: bool,
}

impl Spinner {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            animating: false,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.enabled && self.animating
    }
}

impl StateWidget for Spinner {
    fn reset(&mut self) {
        self.animating = false;
    }

    fn send(&mut self, _event: &Event) {}

    fn update(&mut self, status: &Status) {
        if !status.is_visible() {
            self.animating = false;
            return;
        }
        match status {
            Status::Waiting | Status::Loading | Status::BufferEmpty => self.animating = true,
            Status::Playing => self.animating = false,
            _ => {}
        }
    }
}
