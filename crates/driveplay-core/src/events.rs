//! Playlist event emission
//!
//! Every observable transition of an open playlist is published as an
//! [`EventRecord`] on a broadcast channel, in the order it happened.

use crate::types::{FallbackStatus, MountId, SessionId, SurfaceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use url::Url;
use uuid::Uuid;

/// Playlist event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaylistEvent {
    /// Session opened
    Opened {
        items: usize,
        active_index: usize,
    },

    /// A new item became active
    ItemActivated {
        index: usize,
        item_id: String,
    },

    /// A surface was mounted for a source
    SourceMounted {
        mount_id: MountId,
        item_id: String,
        strategy: u8,
        surface: SurfaceKind,
        url: Url,
    },

    /// Fallback status changed
    StatusChanged {
        item_id: String,
        from: FallbackStatus,
        to: FallbackStatus,
    },

    /// A load attempt got no outcome in time
    LoadTimedOut {
        mount_id: MountId,
        strategy: u8,
    },

    /// Every strategy failed for the item
    Exhausted {
        item_id: String,
    },

    /// Natural end reached; the next item follows after `delay_ms`
    AutoAdvanceScheduled {
        from_index: usize,
        delay_ms: u64,
    },

    /// A pending auto-advance was superseded
    AutoAdvanceCancelled,

    SidebarToggled {
        visible: bool,
    },

    PlaybackChanged {
        playing: bool,
    },

    MuteChanged {
        muted: bool,
    },

    /// Session closed
    Closed,
}

/// Event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID
    pub id: Uuid,
    /// Session ID
    pub session_id: SessionId,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number, starting at 1
    pub sequence: u64,
    /// The event
    #[serde(flatten)]
    pub event: PlaylistEvent,
}

/// Sequenced event publisher owned by the controller task
#[derive(Debug)]
pub struct EventBus {
    session_id: SessionId,
    sequence: u64,
    tx: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(session_id: SessionId, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            session_id,
            sequence: 0,
            tx,
        }
    }

    pub fn sender(&self) -> broadcast::Sender<EventRecord> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    /// Number of events emitted so far
    pub fn emitted(&self) -> u64 {
        self.sequence
    }

    pub fn emit(&mut self, event: PlaylistEvent) {
        self.sequence += 1;
        let record = EventRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence: self.sequence,
            event,
        };
        trace!(sequence = record.sequence, event = ?record.event, "Event emitted");
        // No subscribers is fine
        let _ = self.tx.send(record);
    }
}
