//! Driveplay Core - playlist playback for cloud-drive videos
//!
//! This crate provides the playback controller behind a drive video
//! playlist:
//! - Playlist session with saturating navigation and auto-advance on end
//! - Source resolution through a fixed ladder of delivery strategies
//! - Fallback state machine driven by surface load signals and timeouts
//! - Surface mounting with fresh signal wiring per source
//! - Snapshot and event publication for the UI layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Driveplay Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playlist   │  │    Source    │  │   Strategy   │           │
//! │  │   Session    │  │   Resolver   │──│    Table     │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘           │
//! │         │                 │                                     │
//! │         └────────┬────────┘                                     │
//! │                  │                                              │
//! │           ┌──────┴──────┐   commands    ┌──────────────┐        │
//! │           │ Controller  │◀──────────────│   Handle     │        │
//! │           │    Task     │               └──────────────┘        │
//! │           └──┬───────┬──┘                                       │
//! │    mount /   │       │  snapshots,                              │
//! │    signals   │       │  events                                  │
//! │  ┌───────────┴──┐  ┌─┴────────────┐  ┌──────────────┐           │
//! │  │   Surface    │  │  Event Bus   │  │   Catalog    │           │
//! │  │   Factory    │  │              │  │   Provider   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod strategy;
pub mod resolver;
pub mod playlist;
pub mod surface;
pub mod events;
pub mod controller;
pub mod scripted;
pub mod catalog;

pub use error::{Error, Result};
pub use types::*;
pub use config::{ControllerConfig, ExternalLinkPolicy};
pub use strategy::{Strategy, StrategyTable, STRATEGY_COUNT};
pub use resolver::{FallbackAttempt, SourceResolver, Transition};
pub use playlist::PlaylistSession;
pub use surface::{MountRequest, MountedSurface, SignalSink, SurfaceFactory, SurfaceSignal};
pub use events::{EventBus, EventRecord, PlaylistEvent};
pub use controller::{open_playlist, ControllerHandle, Snapshot};
pub use scripted::{MountLog, MountRecord, ScriptStep, ScriptedSurfaceFactory};
pub use catalog::{playable_items, CatalogProvider, JsonCatalog};
#[cfg(feature = "http-catalog")]
pub use catalog::HttpCatalog;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Driveplay Core initialized");
}
