//! Media handles and the native engine seam
//!
//! A [`MediaHandle`] names something playable; a [`ResourceProvider`]
//! turns it into a [`NativePlayer`], the platform player/item pair that a
//! media session observes.
//!
//! [`ResourceProvider`]: crate::provider::ResourceProvider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use crate::runtime::{Inbox, Message};
use crate::session::{SessionId, SessionInput};
use crate::types::{Failure, NativeStatus, TimeControl, TimeRange};

/// Opaque media identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub String);

impl MediaId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for MediaId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&Url> for MediaId {
    fn from(url: &Url) -> Self {
        Self(url.as_str().to_string())
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unparsed media URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaUrl(pub String);

impl MediaUrl {
    /// Parse into a URL, `None` if malformed
    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaUrl {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl From<String> for MediaUrl {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<Url> for MediaUrl {
    fn from(url: Url) -> Self {
        Self(url.into())
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to one playable unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaHandle {
    Id(MediaId),
    Url(MediaUrl),
    IdUrl { id: MediaId, url: MediaUrl },
}

impl MediaHandle {
    pub fn id(id: impl Into<MediaId>) -> Self {
        MediaHandle::Id(id.into())
    }

    pub fn url(url: impl Into<MediaUrl>) -> Self {
        MediaHandle::Url(url.into())
    }

    pub fn id_url(id: impl Into<MediaId>, url: impl Into<MediaUrl>) -> Self {
        MediaHandle::IdUrl {
            id: id.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaHandle::Id(id) => write!(f, "id:{}", id),
            MediaHandle::Url(url) => write!(f, "url:{}", url),
            MediaHandle::IdUrl { id, url } => write!(f, "id:{} url:{}", id, url),
        }
    }
}

/// Process-unique identity of a native item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Options applied to a native item when it is installed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemOptions {
    pub allows_cellular_access: bool,
    pub network_while_paused: bool,
    /// Forward buffer in seconds
    pub preferred_forward_buffer: f64,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            allows_cellular_access: true,
            network_while_paused: false,
            preferred_forward_buffer: 1.0,
        }
    }
}

/// Observable signals raised by a native player
#[derive(Debug, Clone, PartialEq)]
pub enum NativeSignal {
    StatusChanged(NativeStatus),
    TimeControlChanged(TimeControl),
    /// Rate change on engines that do not report time control
    RateChanged(f32),
    LoadedRangesChanged(Vec<TimeRange>),
    PlaybackBufferEmpty(bool),
    PlaybackLikelyToKeepUp(bool),
    /// Process-wide end notification naming the item that finished
    DidPlayToEnd(ItemId),
    SeekCompleted { finished: bool },
}

/// Delivery channel handed to a native player while a session observes it
#[derive(Debug, Clone)]
pub struct SignalSink {
    session: SessionId,
    inbox: Inbox,
}

impl SignalSink {
    pub(crate) fn new(session: SessionId, inbox: Inbox) -> Self {
        Self { session, inbox }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queue a signal for the owning session; false once the loop is gone
    pub fn emit(&self, signal: NativeSignal) -> bool {
        self.inbox
            .send(Message::Session {
                session: self.session,
                input: SessionInput::Signal(signal),
            })
            .is_ok()
    }
}

/// Platform player/item pair
///
/// Methods are called from the event loop; implementations use interior
/// mutability. Seek completion is reported through
/// [`NativeSignal::SeekCompleted`].
pub trait NativePlayer: Send + Sync + fmt::Debug {
    fn item_id(&self) -> ItemId;

    fn status(&self) -> NativeStatus;

    /// Failure details when `status()` is `Failed`
    fn failure(&self) -> Option<Failure>;

    /// `None` on engines that only report a rate
    fn time_control(&self) -> Option<TimeControl>;

    fn rate(&self) -> f32;

    fn current_time(&self) -> Option<f64>;

    fn duration(&self) -> Option<f64>;

    fn loaded_ranges(&self) -> Vec<TimeRange>;

    fn play_immediately(&self, rate: f32);

    fn pause(&self);

    /// Seek with zero tolerance before and after
    fn seek(&self, to: f64);

    fn cancel_pending_seeks(&self);

    fn configure(&self, options: ItemOptions);

    fn add_observer(&self, sink: SignalSink);

    fn remove_observers(&self);
}

/// Builds native players straight from URLs
pub trait MediaEngine: Send + Sync {
    fn open(&self, url: &Url, options: ItemOptions) -> Arc<dyn NativePlayer>;
}
