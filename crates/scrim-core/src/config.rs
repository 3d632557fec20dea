//! Player configuration
//!
//! Per-instance policy knobs for the playback coordinator. Every field has a
//! default so partial JSON documents load cleanly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Which overlay widgets are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Blur/effect layer
    pub effect: bool,
    /// Title bar
    pub title: bool,
    /// Loading spinner
    pub indicator: bool,
    /// Play/pause, progress, zoom and next controls
    pub progress: bool,
}

impl OverlayOptions {
    pub const NONE: OverlayOptions = OverlayOptions {
        effect: false,
        title: false,
        indicator: false,
        progress: false,
    };

    pub const ALL: OverlayOptions = OverlayOptions {
        effect: true,
        title: true,
        indicator: true,
        progress: true,
    };
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::ALL
    }
}

/// Which progress-bar controls accept input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressControls {
    pub play: bool,
    pub pan: bool,
    pub zoom: bool,
    pub next: bool,
}

impl ProgressControls {
    pub const NONE: ProgressControls = ProgressControls {
        play: false,
        pan: false,
        zoom: false,
        next: false,
    };

    /// Play, pan and zoom
    pub const NORMAL: ProgressControls = ProgressControls {
        play: true,
        pan: true,
        zoom: true,
        next: false,
    };

    pub const ALL: ProgressControls = ProgressControls {
        play: true,
        pan: true,
        zoom: true,
        next: true,
    };
}

impl Default for ProgressControls {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Loaded span required ahead of the playhead before a stalled player is resumed (seconds)
    pub minimum_lookahead_secs: f64,
    /// Delay before a flashed overlay hides itself (milliseconds)
    pub auto_hide_delay_ms: u64,
    /// Grace window before pausing a view that left its window (milliseconds)
    pub detach_grace_ms: u64,
    /// Progress tick interval (milliseconds)
    pub tick_interval_ms: u64,
    /// Keep playing while the view is not in a window
    pub plays_without_window: bool,
    /// Allow items to use cellular networks
    pub allows_cellular_access: bool,
    /// Forward buffer the engine should aim for (seconds)
    pub preferred_forward_buffer_secs: f64,
    /// Let live streams keep using the network while paused
    pub network_while_paused: bool,
    /// Log lifecycle transitions at info level
    pub log_enabled: bool,
    /// Visible overlay widgets
    pub overlay: OverlayOptions,
    /// Enabled progress-bar controls
    pub controls: ProgressControls,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            minimum_lookahead_secs: 5.0,
            auto_hide_delay_ms: 5_000,
            detach_grace_ms: 200,
            tick_interval_ms: 33,
            plays_without_window: false,
            allows_cellular_access: true,
            preferred_forward_buffer_secs: 1.0,
            network_while_paused: false,
            log_enabled: false,
            overlay: OverlayOptions::default(),
            controls: ProgressControls::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the coordinator cannot schedule with
    pub fn validate(&self) -> Result<()> {
        if !self.minimum_lookahead_secs.is_finite() || self.minimum_lookahead_secs < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "minimum_lookahead_secs must be a non-negative number, got {}",
                self.minimum_lookahead_secs
            )));
        }
        if !self.preferred_forward_buffer_secs.is_finite()
            || self.preferred_forward_buffer_secs < 0.0
        {
            return Err(Error::InvalidConfig(format!(
                "preferred_forward_buffer_secs must be a non-negative number, got {}",
                self.preferred_forward_buffer_secs
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig("tick_interval_ms must be positive".into()));
        }
        if self.auto_hide_delay_ms == 0 {
            return Err(Error::InvalidConfig(
                "auto_hide_delay_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_delay_ms)
    }

    pub fn detach_grace(&self) -> Duration {
        Duration::from_millis(self.detach_grace_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
