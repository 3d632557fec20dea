//! Scrim Core - Playback coordinator for overlay video players
//!
//! This crate provides the playback logic behind a video view:
//! - Media sessions normalizing native player signals into one status stream
//! - A playback controller with cancelable resolution and seek-on-ready
//! - A presentation binder applying window, lifecycle and buffering policy
//! - Headless overlay widgets (title, effect layer, spinner, progress bar)
//! - A single-task event loop driving all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Scrim Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   PlayerHandle ──── Message ────▶ PlayerRuntime (one task)      │
//! │                                         │                       │
//! │                                  ┌──────┴──────┐                │
//! │                                  │ PlayerView  │──▶ Overlay     │
//! │                                  │  (binder)   │   + widgets    │
//! │                                  └──────┬──────┘                │
//! │                                         │                       │
//! │  ┌──────────────┐               ┌───────┴──────┐                │
//! │  │   Resource   │◀── resolve ───│   Playback   │                │
//! │  │   Provider   │               │  Controller  │                │
//! │  └──────────────┘               └───────┬──────┘                │
//! │                                         │                       │
//! │                                  ┌──────┴──────┐                │
//! │                                  │    Media    │◀── signals     │
//! │                                  │   Session   │   NativePlayer │
//! │                                  └─────────────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod media;
pub mod provider;
pub mod session;
pub mod controller;
pub mod scheduler;
pub mod overlay;
pub mod binder;
pub mod runtime;
pub mod cache;
pub mod sim;

pub use error::{Error, Result};
pub use types::*;
pub use config::{OverlayOptions, PlayerConfig, ProgressControls};
pub use media::{ItemId, ItemOptions, MediaEngine, MediaHandle, MediaId, MediaUrl, NativePlayer, NativeSignal};
pub use provider::{CatalogProvider, DirectProvider, ResourceProvider};
pub use session::{MediaSession, SessionId};
pub use controller::{PlaybackController, PlayerDelegate, Update};
pub use overlay::{Control, Overlay, ScrubAction, SoundEffects};
pub use binder::PlayerView;
pub use runtime::{Command, Message, PlayerHandle, PlayerRuntime};
pub use cache::{setup_cache, CacheConfig, DiskCache, FileVersionStore};
pub use sim::{SimEngine, SimPlayer, SimProfile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Scrim Core initialized");
}
