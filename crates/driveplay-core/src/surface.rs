//! Playback surface seam
//!
//! The embedding surface (a native media element or an embedded document)
//! lives outside this crate. The controller asks a [`SurfaceFactory`] to
//! mount one surface per source and keeps the returned [`MountedSurface`]
//! handle until it tears it down. Surfaces are never updated in place: a new
//! URL or surface kind always means teardown followed by a fresh mount, with
//! a fresh [`SignalSink`] bound to the new [`MountId`].

use crate::{
    controller::Command,
    strategy::Strategy,
    types::{MountId, SurfaceKind},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::WeakUnboundedSender;
use url::Url;

/// Everything a surface needs to render one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountRequest {
    pub mount_id: MountId,
    pub item_id: String,
    pub item_name: String,
    pub url: Url,
    pub kind: SurfaceKind,
    pub strategy: Strategy,
    /// Start playing as soon as the source is ready
    pub autoplay: bool,
    /// Mute preference carried over from the previous surface
    pub muted: bool,
}

/// Signals a mounted surface reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceSignal {
    /// The source loaded and can play
    Loaded,
    /// The source failed to load
    Failed,
    /// Playback reached the natural end of the item
    Ended,
    Playing,
    Paused,
}

/// Signal wiring for exactly one mounted surface.
///
/// Signals sent after the surface was replaced are discarded by the
/// controller. Sends after the session closed are dropped silently.
#[derive(Debug, Clone)]
pub struct SignalSink {
    mount_id: MountId,
    tx: WeakUnboundedSender<Command>,
}

impl SignalSink {
    pub(crate) fn new(mount_id: MountId, tx: WeakUnboundedSender<Command>) -> Self {
        Self { mount_id, tx }
    }

    pub fn mount_id(&self) -> MountId {
        self.mount_id
    }

    /// Deliver a signal. Returns false if the controller is gone.
    pub fn send(&self, signal: SurfaceSignal) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx
                .send(Command::Signal {
                    mount_id: self.mount_id,
                    signal,
                })
                .is_ok(),
            None => false,
        }
    }

    pub fn loaded(&self) -> bool {
        self.send(SurfaceSignal::Loaded)
    }

    pub fn failed(&self) -> bool {
        self.send(SurfaceSignal::Failed)
    }

    pub fn ended(&self) -> bool {
        self.send(SurfaceSignal::Ended)
    }

    pub fn playing(&self) -> bool {
        self.send(SurfaceSignal::Playing)
    }

    pub fn paused(&self) -> bool {
        self.send(SurfaceSignal::Paused)
    }
}

/// Creates surfaces on demand
pub trait SurfaceFactory: Send + 'static {
    /// Mount a new surface for `request`.
    ///
    /// An error is treated exactly like a load failure of that source.
    fn mount(&mut self, request: &MountRequest, sink: SignalSink) -> Result<Box<dyn MountedSurface>>;
}

/// Direct handle to a mounted surface, owned by the controller.
///
/// Only native-media surfaces are expected to implement the playback
/// controls; the defaults report them as unsupported.
pub trait MountedSurface: Send {
    /// Destroy the surface and detach its signal wiring
    fn teardown(self: Box<Self>);

    fn play(&mut self) -> Result<()> {
        Err(Error::surface("play not supported"))
    }

    fn pause(&mut self) -> Result<()> {
        Err(Error::surface("pause not supported"))
    }

    fn set_muted(&mut self, _muted: bool) -> Result<()> {
        Err(Error::surface("mute not supported"))
    }
}
