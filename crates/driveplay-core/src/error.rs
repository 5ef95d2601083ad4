//! Error types for Driveplay Core

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
///
/// Load failures from the playback surface are not represented here: they
/// drive the fallback ladder and only surface to the user as the
/// `Exhausted` status.
#[derive(Error, Debug)]
pub enum Error {
    // Playlist errors
    #[error("Index {index} out of range for playlist of {len} items")]
    InvalidIndex { index: usize, len: usize },

    #[error("Playlist has no items")]
    EmptyPlaylist,

    #[error("Playlist session is closed")]
    SessionClosed,

    // Surface errors
    #[error("Playback controls unavailable on {surface} surface")]
    ControlsUnavailable { surface: String },

    #[error("No playback surface mounted")]
    NoSurface,

    #[error("Surface control failed: {0}")]
    Surface(String),

    // Source errors
    #[error("Invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Catalog errors
    #[error("Failed to fetch catalog: {0}")]
    CatalogFetch(String),

    #[error("Failed to parse catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),

    // Network errors
    #[cfg(feature = "http-catalog")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a surface control error
    pub fn surface(msg: impl Into<String>) -> Self {
        Error::Surface(msg.into())
    }

    /// Returns true if the caller may reasonably try the same call again
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::CatalogFetch(_) | Error::Surface(_) | Error::NoSurface | Error::Io(_) => true,
            #[cfg(feature = "http-catalog")]
            Error::Network(_) => true,
            _ => false,
        }
    }

    /// Stable machine-readable code, attached to log records
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidIndex { .. } => "INVALID_INDEX",
            Error::EmptyPlaylist => "EMPTY_PLAYLIST",
            Error::SessionClosed => "SESSION_CLOSED",
            Error::ControlsUnavailable { .. } => "CONTROLS_UNAVAILABLE",
            Error::NoSurface => "NO_SURFACE",
            Error::Surface(_) => "SURFACE",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::CatalogFetch(_) => "CATALOG_FETCH",
            Error::CatalogParse(_) => "CATALOG_PARSE",
            #[cfg(feature = "http-catalog")]
            Error::Network(_) => "NETWORK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO",
        }
    }
}
