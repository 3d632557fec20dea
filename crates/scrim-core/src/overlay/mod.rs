//! Overlay mask and its sub-widgets
//!
//! Headless models of the controls drawn over the video. The overlay keeps
//! the mask state (shown or hidden) and fans statuses and events out to each
//! widget. Timing of the auto-hide belongs to the binder.

mod effect;
mod progress;
mod sound;
mod spinner;
mod title;

pub use effect::EffectLayer;
pub use progress::{ProgressBar, ScrubAction};
pub use sound::{Silent, Sound, SoundEffects};
pub use spinner::Spinner;
pub use title::TitleBar;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{OverlayOptions, ProgressControls};
use crate::types::{Event, MaskAction, Status};

/// Widget driven by player statuses and overlay events
pub trait StateWidget {
    fn reset(&mut self);

    fn send(&mut self, event: &Event);

    fn update(&mut self, status: &Status);
}

/// Overlay buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Play,
    Zoom,
    Next,
    Exit,
}

/// Overlay over one player view
pub struct Overlay {
    options: OverlayOptions,
    controls: ProgressControls,
    visible: bool,
    title: TitleBar,
    effect: EffectLayer,
    spinner: Spinner,
    progress: ProgressBar,
    sounds: Arc<dyn SoundEffects>,
}

impl Overlay {
    pub fn new(options: OverlayOptions, controls: ProgressControls) -> Self {
        Self {
            options,
            controls,
            visible: false,
            title: TitleBar::new(options.title),
            effect: EffectLayer::new(options.effect),
            spinner: Spinner::new(options.indicator),
            progress: ProgressBar::new(options.progress, controls),
            sounds: Arc::new(Silent),
        }
    }

    pub fn with_sounds(mut self, sounds: Arc<dyn SoundEffects>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn options(&self) -> OverlayOptions {
        self.options
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn title(&self) -> &TitleBar {
        &self.title
    }

    pub fn title_mut(&mut self) -> &mut TitleBar {
        &mut self.title
    }

    pub fn effect(&self) -> &EffectLayer {
        &self.effect
    }

    pub fn spinner(&self) -> &Spinner {
        &self.spinner
    }

    pub fn progress(&self) -> &ProgressBar {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressBar {
        &mut self.progress
    }

    fn widgets(&mut self) -> [&mut dyn StateWidget; 4] {
        [
            &mut self.title,
            &mut self.effect,
            &mut self.spinner,
            &mut self.progress,
        ]
    }

    pub fn reset(&mut self) {
        self.visible = false;
        for widget in self.widgets() {
            widget.reset();
        }
    }

    pub fn update(&mut self, status: &Status) {
        for widget in self.widgets() {
            widget.update(status);
        }
    }

    pub fn send(&mut self, event: &Event) {
        for widget in self.widgets() {
            widget.send(event);
        }
    }

    /// Apply a mask action and return the event announcing it
    pub fn mask(&mut self, action: MaskAction) -> Event {
        self.visible = action != MaskAction::Hide;
        let event = Event::mask(action, true);
        self.send(&event);
        event
    }

    /// Mask action for a tap gesture
    pub fn tap(&self, event: &Event) -> Option<MaskAction> {
        match event {
            Event::SingleTap { .. } => Some(self.toggle()),
            Event::DoubleTap { .. } if self.controls.zoom => Some(MaskAction::Flash),
            Event::DoubleTap { .. } => Some(self.toggle()),
            _ => None,
        }
    }

    fn toggle(&self) -> MaskAction {
        if self.visible {
            MaskAction::Hide
        } else {
            MaskAction::Flash
        }
    }

    /// Button press, with click feedback
    pub fn press(&self, control: Control) -> Option<Event> {
        self.sounds.play(Sound::Click);
        match control {
            Control::Exit => self.title.exit(),
            other => self.progress.press(other),
        }
    }

    pub fn scrub(&mut self, action: ScrubAction) -> Option<(MaskAction, Option<Event>)> {
        if action == ScrubAction::Began {
            self.sounds.play(Sound::Scrub);
        }
        self.progress.scrub(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Sound>>);

    impl SoundEffects for Recorder {
        fn play(&self, sound: Sound) {
            self.0.lock().push(sound);
        }
    }

    #[test]
    fn test_single_tap_toggles() {
        let mut overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NONE);
        let tap = Event::single_tap(Point::default());

        assert_eq!(overlay.tap(&tap), Some(MaskAction::Flash));
        overlay.mask(MaskAction::Flash);
        assert!(overlay.is_visible());
        assert!(overlay.title().is_shown());
        assert_eq!(overlay.tap(&tap), Some(MaskAction::Hide));
    }

    #[test]
    fn test_double_tap_with_zoom_always_flashes() {
        let mut overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NORMAL);
        overlay.mask(MaskAction::Show);
        let tap = Event::double_tap(Point::default());
        assert_eq!(overlay.tap(&tap), Some(MaskAction::Flash));

        let overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NONE);
        assert_eq!(overlay.tap(&tap), Some(MaskAction::Flash));
    }

    #[test]
    fn test_status_fans_out() {
        let mut overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NORMAL);
        overlay.update(&Status::Loading);
        assert!(overlay.spinner().is_animating());
        assert!(overlay.effect().is_visible());

        overlay.update(&Status::Playing);
        assert!(!overlay.spinner().is_animating());
        assert!(overlay.progress().is_playing());
    }

    #[test]
    fn test_disabled_widgets_stay_hidden() {
        let mut overlay = Overlay::new(OverlayOptions::NONE, ProgressControls::NORMAL);
        overlay.update(&Status::Loading);
        overlay.mask(MaskAction::Show);
        assert!(!overlay.spinner().is_animating());
        assert!(!overlay.effect().is_visible());
        assert!(!overlay.title().is_shown());
        assert!(!overlay.progress().is_shown());
    }

    #[test]
    fn test_unknown_and_failed_hide_spinner_and_progress() {
        let mut overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NORMAL);
        overlay.mask(MaskAction::Show);
        overlay.update(&Status::Unknown);
        assert!(!overlay.spinner().is_animating());
        assert!(!overlay.progress().is_shown());

        overlay.update(&Status::Loading);
        assert!(overlay.spinner().is_animating());
        assert!(overlay.progress().is_shown());

        overlay.update(&Status::Failed(crate::types::Failure::new(-11800, "decoder error")));
        assert!(!overlay.spinner().is_animating());
        assert!(!overlay.progress().is_shown());
        assert!(overlay.is_visible());
    }

    #[test]
    fn test_presses_play_sounds() {
        let sounds = Arc::new(Recorder::default());
        let overlay = Overlay::new(OverlayOptions::ALL, ProgressControls::NORMAL)
            .with_sounds(sounds.clone());

        assert_eq!(overlay.press(Control::Exit), Some(Event::Exit));
        assert_eq!(overlay.press(Control::Play), Some(Event::Play));
        assert_eq!(*sounds.0.lock(), vec![Sound::Click, Sound::Click]);
    }
}
