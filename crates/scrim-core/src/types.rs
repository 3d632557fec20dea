//! Core types for Scrim
//!
//! The closed status and event vocabularies shared by the session,
//! controller, binder and overlay widgets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Snapshot of a failure carried by [`Status::Failed`].
///
/// Two failures are equal when their codes match; the message is
/// informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub code: i64,
    pub message: String,
}

impl Failure {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        Failure::new(err.code(), err.to_string())
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::from(&err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Normalized playback status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Status {
    /// Initial state, nothing known about the item
    Unknown,
    /// Resolving the media handle
    Loading,
    /// Native item is ready to play
    Ready,
    /// Resolution or playback failed
    Failed(Failure),
    /// Playback paused
    Paused,
    /// Session torn down
    Stopped,
    /// Waiting for data or for the requested rate
    Waiting,
    /// Playing at full rate
    Playing,
    /// Played to the end of the item
    EndOfMedia,
    /// Playback buffer ran dry
    BufferEmpty,
    /// Engine predicts playback can keep up
    LikelyToKeepUp,
    /// Periodic playhead position in seconds
    Progress(f64),
}

impl Status {
    /// Whether overlay spinners and progress should be shown
    pub fn is_visible(&self) -> bool {
        !matches!(self, Status::Unknown | Status::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Status::Failed(_))
    }

    /// Progress seconds, if this is a progress tick
    pub fn progress(&self) -> Option<f64> {
        match self {
            Status::Progress(seconds) => Some(*seconds),
            _ => None,
        }
    }

    /// Map the native readiness state
    pub fn from_native(status: NativeStatus, failure: Option<Failure>) -> Self {
        match status {
            NativeStatus::Unknown => Status::Unknown,
            NativeStatus::ReadyToPlay => Status::Ready,
            NativeStatus::Failed => Status::Failed(
                failure.unwrap_or_else(|| Failure::new(0, "playback failed")),
            ),
        }
    }

    /// Map the native time-control state
    pub fn from_time_control(control: TimeControl) -> Self {
        match control {
            TimeControl::Paused => Status::Paused,
            TimeControl::WaitingToPlayAtSpecifiedRate => Status::Waiting,
            TimeControl::Playing => Status::Playing,
        }
    }

    /// Map a raw playback rate for engines without time-control reporting
    pub fn from_rate(rate: f32) -> Self {
        if rate.is_nan() {
            Status::Unknown
        } else if rate <= 0.0 {
            Status::Paused
        } else if rate < 1.0 {
            Status::Waiting
        } else {
            Status::Playing
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unknown => write!(f, "unknown"),
            Status::Loading => write!(f, "loading"),
            Status::Ready => write!(f, "ready"),
            Status::Failed(failure) => write!(f, "failed: {}", failure),
            Status::Paused => write!(f, "paused"),
            Status::Stopped => write!(f, "stopped"),
            Status::Waiting => write!(f, "waiting"),
            Status::Playing => write!(f, "playing"),
            Status::EndOfMedia => write!(f, "end of media"),
            Status::BufferEmpty => write!(f, "buffer empty"),
            Status::LikelyToKeepUp => write!(f, "likely to keep up"),
            Status::Progress(seconds) => write!(f, "progress {:.2}s", seconds),
        }
    }
}

/// Overlay mask actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskAction {
    Hide,
    Show,
    /// Show, then hide after the auto-hide delay
    Flash,
}

/// Zoom actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomAction {
    In,
    Out,
}

impl ZoomAction {
    pub fn inverse(self) -> Self {
        match self {
            ZoomAction::In => ZoomAction::Out,
            ZoomAction::Out => ZoomAction::In,
        }
    }
}

/// Recognizer state attached to tap events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    Possible,
    Began,
    Changed,
    #[default]
    Ended,
    Cancelled,
    Failed,
}

/// Point in overlay coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Commands and notifications exchanged between the overlay and playback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Exit,
    Play,
    Pause,
    Next,
    SingleTap { state: GestureState, point: Point },
    DoubleTap { state: GestureState, point: Point },
    Mask { action: MaskAction, animate: bool },
    Zoom { action: ZoomAction, animate: bool },
    /// Seek to a time in seconds
    Seek { time: f64 },
}

impl Event {
    pub fn seek(time: f64) -> Self {
        Event::Seek { time }
    }

    pub fn mask(action: MaskAction, animate: bool) -> Self {
        Event::Mask { action, animate }
    }

    pub fn zoom(action: ZoomAction, animate: bool) -> Self {
        Event::Zoom { action, animate }
    }

    pub fn single_tap(point: Point) -> Self {
        Event::SingleTap {
            state: GestureState::Ended,
            point,
        }
    }

    pub fn double_tap(point: Point) -> Self {
        Event::DoubleTap {
            state: GestureState::Ended,
            point,
        }
    }

    /// `Some(true)` if this mask event leaves the overlay hidden
    pub fn mask_hides(&self) -> Option<bool> {
        match self {
            Event::Mask { action, .. } => Some(*action != MaskAction::Show),
            _ => None,
        }
    }

    /// `Some(true)` if this is a zoom-in event
    pub fn is_zoom_in(&self) -> Option<bool> {
        match self {
            Event::Zoom { action, .. } => Some(*action == ZoomAction::In),
            _ => None,
        }
    }

    /// Target time of a seek event
    pub fn seek_time(&self) -> Option<f64> {
        match self {
            Event::Seek { time } => Some(*time),
            _ => None,
        }
    }
}

// Equality only looks at the discriminant, plus the action for mask/zoom
// and the time for seeks.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Exit, Event::Exit)
            | (Event::Play, Event::Play)
            | (Event::Pause, Event::Pause)
            | (Event::Next, Event::Next)
            | (Event::SingleTap { .. }, Event::SingleTap { .. })
            | (Event::DoubleTap { .. }, Event::DoubleTap { .. }) => true,
            (Event::Mask { action: l, .. }, Event::Mask { action: r, .. }) => l == r,
            (Event::Zoom { action: l, .. }, Event::Zoom { action: r, .. }) => l == r,
            (Event::Seek { time: l }, Event::Seek { time: r }) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Exit => write!(f, "exit"),
            Event::Play => write!(f, "play"),
            Event::Pause => write!(f, "pause"),
            Event::Next => write!(f, "next"),
            Event::SingleTap { .. } => write!(f, "single tap"),
            Event::DoubleTap { .. } => write!(f, "double tap"),
            Event::Mask { action, .. } => write!(f, "mask {:?}", action),
            Event::Zoom { action, .. } => write!(f, "zoom {:?}", action),
            Event::Seek { time } => write!(f, "seek {:.2}s", time),
        }
    }
}

/// Loaded time range, as `(start, duration)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Both bounds are finite numbers
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.duration.is_finite()
    }

    /// True if `[from, from + span)` lies inside this range
    pub fn covers(&self, from: f64, span: f64) -> bool {
        self.start <= from && self.end() >= from + span
    }
}

/// Drop ranges whose bounds are not numeric
pub fn valid_ranges(ranges: &[TimeRange]) -> Vec<TimeRange> {
    ranges.iter().copied().filter(TimeRange::is_valid).collect()
}

/// How video content is fitted into the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoGravity {
    /// Letterboxed, whole frame visible
    AspectFit,
    /// Cropped to fill the view
    #[default]
    AspectFill,
}

impl From<ZoomAction> for VideoGravity {
    fn from(action: ZoomAction) -> Self {
        match action {
            ZoomAction::In => VideoGravity::AspectFit,
            ZoomAction::Out => VideoGravity::AspectFill,
        }
    }
}

/// Readiness reported by the native player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeStatus {
    #[default]
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Time-control state reported by the native player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeControl {
    #[default]
    Paused,
    WaitingToPlayAtSpecifiedRate,
    Playing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility() {
        assert!(!Status::Unknown.is_visible());
        assert!(!Status::Failed(Failure::new(-1, "x")).is_visible());
        for status in [
            Status::Loading,
            Status::Ready,
            Status::Paused,
            Status::Stopped,
            Status::Waiting,
            Status::Playing,
            Status::EndOfMedia,
            Status::BufferEmpty,
            Status::LikelyToKeepUp,
            Status::Progress(3.0),
        ] {
            assert!(status.is_visible(), "{} should be visible", status);
        }
    }

    #[test]
    fn test_failed_equality_uses_code_only() {
        let a = Status::Failed(Failure::new(-1000, "bad url"));
        let b = Status::Failed(Failure::new(-1000, "something else"));
        let c = Status::Failed(Failure::new(-1100, "bad url"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Status::Progress(1.5), Status::Progress(1.5));
        assert_ne!(Status::Progress(1.5), Status::Progress(2.0));
    }

    #[test]
    fn test_rate_mapping() {
        assert_eq!(Status::from_rate(0.0), Status::Paused);
        assert_eq!(Status::from_rate(-1.0), Status::Paused);
        assert_eq!(Status::from_rate(0.5), Status::Waiting);
        assert_eq!(Status::from_rate(1.0), Status::Playing);
        assert_eq!(Status::from_rate(2.0), Status::Playing);
        assert_eq!(Status::from_rate(f32::NAN), Status::Unknown);
    }

    #[test]
    fn test_event_equality_ignores_animation_and_points() {
        assert_eq!(
            Event::mask(MaskAction::Flash, true),
            Event::mask(MaskAction::Flash, false)
        );
        assert_ne!(
            Event::mask(MaskAction::Flash, true),
            Event::mask(MaskAction::Hide, true)
        );
        assert_eq!(
            Event::single_tap(Point::new(1.0, 2.0)),
            Event::SingleTap {
                state: GestureState::Began,
                point: Point::new(9.0, 9.0)
            }
        );
        assert_ne!(Event::seek(1.0), Event::seek(2.0));
        assert_ne!(Event::Play, Event::Pause);
    }

    #[test]
    fn test_event_accessors() {
        assert_eq!(Event::mask(MaskAction::Show, true).mask_hides(), Some(false));
        assert_eq!(Event::mask(MaskAction::Flash, true).mask_hides(), Some(true));
        assert_eq!(Event::zoom(ZoomAction::In, false).is_zoom_in(), Some(true));
        assert_eq!(Event::seek(4.0).seek_time(), Some(4.0));
        assert_eq!(Event::Play.seek_time(), None);
        assert_eq!(ZoomAction::In.inverse(), ZoomAction::Out);
    }

    #[test]
    fn test_time_range_cover() {
        let range = TimeRange::new(0.0, 40.0);
        assert!(range.covers(35.0, 5.0));
        assert!(!TimeRange::new(0.0, 38.0).covers(35.0, 5.0));
        assert_eq!(
            valid_ranges(&[TimeRange::new(f64::NAN, 1.0), range]),
            vec![range]
        );
    }

    #[test]
    fn test_status_json() {
        let json = serde_json::to_string(&Status::Progress(2.5)).unwrap();
        assert_eq!(json, r#"{"status":"progress","value":2.5}"#);
        let json = serde_json::to_string(&Status::EndOfMedia).unwrap();
        assert_eq!(json, r#"{"status":"end_of_media"}"#);
    }
}
