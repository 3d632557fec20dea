//! Title bar

use super::StateWidget;
use crate::types::{Event, MaskAction, Status};

/// Title text plus an exit button
#[derive(Debug, Clone)]
pub struct TitleBar {
    enabled: bool,
    title: String,
    show_exit: bool,
    shown: bool,
}

impl TitleBar {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            title: String::new(),
            show_exit: true,
            shown: false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_show_exit(&mut self, show: bool) {
        self.show_exit = show;
    }

    pub fn is_shown(&self) -> bool {
        self.enabled && self.shown
    }

    /// Exit button tap
    pub fn exit(&self) -> Option<Event> {
        (self.enabled && self.show_exit).then_some(Event::Exit)
    }
}

impl StateWidget for TitleBar {
    fn reset(&mut self) {
        self.shown = false;
    }

    fn send(&mut self, event: &Event) {
        if let Event::Mask { action, .. } = event {
            self.shown = *action != MaskAction::Hide;
        }
    }

    fn update(&mut self, _status: &Status) {}
}
