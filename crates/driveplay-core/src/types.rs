//! Core types for Driveplay

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for an open playlist session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one mounted playback surface instance.
///
/// Allocated by the controller, never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MountId(pub u64);

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mount-{}", self.0)
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// One playable video resource in an open playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    /// Stable identifier, unique within a playlist
    pub id: String,
    /// Display label
    pub name: String,
    /// Size in bytes, if the catalog reported one
    pub size_bytes: Option<u64>,
    /// MIME type reported by the catalog
    pub mime_type: Option<String>,
    /// Link to the item's own viewer page
    pub web_view_link: Option<Url>,
}

impl PlayableItem {
    /// Create an item with only an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size_bytes: None,
            mime_type: None,
            web_view_link: None,
        }
    }

    /// Set the size in bytes
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Set the viewer link
    pub fn with_web_view_link(mut self, link: Url) -> Self {
        self.web_view_link = Some(link);
        self
    }

    /// Human-readable size, rounded to whole mebibytes
    pub fn display_size(&self) -> String {
        match self.size_bytes {
            Some(bytes) => format!("{}MB", (bytes as f64 / MIB).round() as u64),
            None => "Unknown size".to_string(),
        }
    }
}

/// File record as supplied by the drive catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Decimal byte count; the catalog sends it as a string
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<Url>,
    #[serde(default)]
    pub web_content_link: Option<Url>,
}

impl DriveFile {
    /// Returns true for records the video playlist can play
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

impl From<DriveFile> for PlayableItem {
    fn from(file: DriveFile) -> Self {
        let size_bytes = file.size.as_deref().and_then(|s| s.trim().parse().ok());
        Self {
            id: file.id,
            name: file.name,
            size_bytes,
            mime_type: Some(file.mime_type),
            web_view_link: file.web_view_link,
        }
    }
}

/// Which kind of element the embedding surface must render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Native media element; exposes programmatic playback controls
    NativeMedia,
    /// Embedded document (iframe); no programmatic controls
    EmbeddedDocument,
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceKind::NativeMedia => write!(f, "native-media"),
            SurfaceKind::EmbeddedDocument => write!(f, "embedded-document"),
        }
    }
}

/// Fallback state machine status for the active item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "strategy", rename_all = "snake_case")]
pub enum FallbackStatus {
    /// Waiting for a load outcome on the given strategy index
    Loading(u8),
    /// Current strategy confirmed working
    Settled,
    /// Manual retry issued, new attempt not yet rendering
    Retrying,
    /// Every strategy failed for this item
    Exhausted,
}

impl FallbackStatus {
    /// Returns true while a load outcome is pending
    pub fn is_loading(&self) -> bool {
        matches!(self, FallbackStatus::Loading(_))
    }
}

impl std::fmt::Display for FallbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackStatus::Loading(n) => write!(f, "loading({})", n),
            FallbackStatus::Settled => write!(f, "settled"),
            FallbackStatus::Retrying => write!(f, "retrying"),
            FallbackStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}
