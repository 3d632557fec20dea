//! Error types for Scrim Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric codes shared with the platform URL-loading error domain.
pub mod codes {
    pub const CANCELLED: i64 = -999;
    pub const BAD_URL: i64 = -1000;
    pub const NETWORK_CONNECTION_LOST: i64 = -1005;
    pub const FILE_DOES_NOT_EXIST: i64 = -1100;
    pub const NO_SESSION: i64 = -11800;
    pub const INVALID_CONFIG: i64 = -20000;
    pub const IO: i64 = -20001;
    pub const JSON: i64 = -20002;
    pub const INTERNAL: i64 = -20099;
}

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors
    #[error("Not implemented")]
    NotImplemented,

    #[error("Bad URL: {0}")]
    BadUrl(String),

    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),

    // Playback errors
    #[error("Playback failed ({code}): {message}")]
    Playback { code: i64, message: String },

    #[error("No media session attached")]
    NoSession,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a playback error reported by the native engine
    pub fn playback(code: i64, message: impl Into<String>) -> Self {
        Error::Playback {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the provider failed to produce a playable item
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::NotImplemented
                | Error::BadUrl(_)
                | Error::NotFound(_)
                | Error::Cancelled
                | Error::Network(_)
        )
    }

    /// Numeric code used for `Status::Failed` equality
    pub fn code(&self) -> i64 {
        match self {
            Error::NotImplemented => codes::FILE_DOES_NOT_EXIST,
            Error::BadUrl(_) => codes::BAD_URL,
            Error::NotFound(_) => codes::FILE_DOES_NOT_EXIST,
            Error::Cancelled => codes::CANCELLED,
            Error::Network(_) => codes::NETWORK_CONNECTION_LOST,
            Error::Playback { code, .. } => *code,
            Error::NoSession => codes::NO_SESSION,
            Error::InvalidConfig(_) => codes::INVALID_CONFIG,
            Error::Internal(_) => codes::INTERNAL,
            Error::Io(_) => codes::IO,
            Error::Json(_) => codes::JSON,
        }
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotImplemented => "NOT_IMPLEMENTED",
            Error::BadUrl(_) => "BAD_URL",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Cancelled => "CANCELLED",
            Error::Network(_) => "NETWORK",
            Error::Playback { .. } => "PLAYBACK",
            Error::NoSession => "NO_SESSION",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}
