//! Playlist controller - orchestrator for an open playlist
//!
//! Coordinates:
//! - Playlist navigation (next/previous/select, auto-advance on end)
//! - Source fallback through the strategy ladder
//! - Surface mounting and teardown
//! - Auto-advance and load-timeout timers
//! - Snapshot and event publication
//!
//! All state is owned by one Tokio task that drains a single FIFO queue of
//! commands: user actions from [`ControllerHandle`], signals from mounted
//! surfaces, and timer firings. Every command runs to completion before the
//! next one is looked at, so no transition ever observes a half-applied one.

use crate::{
    config::ControllerConfig,
    events::{EventBus, EventRecord, PlaylistEvent},
    playlist::PlaylistSession,
    resolver::{SourceResolver, Transition},
    surface::{MountRequest, MountedSurface, SignalSink, SurfaceFactory, SurfaceSignal},
    types::*,
    Error, Result,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Everything the controller task reacts to
#[derive(Debug)]
pub(crate) enum Command {
    Next(Reply<()>),
    Previous(Reply<()>),
    Select(usize, Reply<()>),
    Retry(Reply<()>),
    ToggleSidebar(Reply<bool>),
    TogglePlay(Reply<bool>),
    ToggleMute(Reply<bool>),
    ExternalUrl(Reply<Url>),
    Snapshot(Reply<Snapshot>),
    Close(Reply<()>),
    Signal { mount_id: MountId, signal: SurfaceSignal },
    AutoAdvanceDue { ticket: u64 },
    LoadTimeout { mount_id: MountId, ticket: u64 },
}

/// Point-in-time view of an open playlist, for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub session_id: SessionId,
    pub item_count: usize,
    /// `None` once closed
    pub active_index: Option<usize>,
    pub item_id: Option<String>,
    /// Display name of the active item
    pub title: Option<String>,
    pub status: Option<FallbackStatus>,
    pub strategy: Option<u8>,
    /// Authoritative source for the mounted surface
    pub resolved_url: Option<Url>,
    pub surface: Option<SurfaceKind>,
    /// Currently mounted surface, if any
    pub mount_id: Option<MountId>,
    pub controls_available: bool,
    pub sidebar_visible: bool,
    pub is_playing: bool,
    pub is_muted: bool,
    /// Items after the active one
    pub remaining: usize,
    pub auto_advance_pending: bool,
    pub closed: bool,
}

impl Snapshot {
    fn inert(session_id: SessionId) -> Self {
        Self {
            session_id,
            item_count: 0,
            active_index: None,
            item_id: None,
            title: None,
            status: None,
            strategy: None,
            resolved_url: None,
            surface: None,
            mount_id: None,
            controls_available: false,
            sidebar_visible: false,
            is_playing: false,
            is_muted: false,
            remaining: 0,
            auto_advance_pending: false,
            closed: false,
        }
    }
}

struct PendingTimer {
    ticket: u64,
    task: JoinHandle<()>,
}

/// Open a playlist and start its controller task.
///
/// Returns `Ok(None)` for an empty item list: there is nothing to render.
/// Must be called from within a Tokio runtime.
pub fn open_playlist<F>(
    items: impl Into<Arc<[PlayableItem]>>,
    initial_item_id: Option<&str>,
    config: ControllerConfig,
    factory: F,
) -> Result<Option<ControllerHandle>>
where
    F: SurfaceFactory,
{
    config.validate()?;

    let session = PlaylistSession::open(items, initial_item_id);
    if session.is_inert() {
        debug!("Empty playlist, not opening");
        return Ok(None);
    }

    let id = SessionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(Snapshot::inert(id));
    let events = EventBus::new(id, config.event_capacity);

    let mut controller = PlaylistController {
        id,
        resolver: SourceResolver::new(config.strategies.clone()),
        config,
        session,
        factory: Box::new(factory),
        surface: None,
        mount_id: None,
        mounts: 0,
        tickets: 0,
        auto_advance: None,
        load_timeout: None,
        is_playing: false,
        is_muted: false,
        closed: false,
        commands: tx.downgrade(),
        events,
        state_tx,
    };

    info!(
        session = %id,
        items = controller.session.len(),
        active_index = controller.session.active_index(),
        "Opening playlist"
    );
    controller.events.emit(PlaylistEvent::Opened {
        items: controller.session.len(),
        active_index: controller.session.active_index(),
    });
    controller.activate_current()?;
    controller.publish();

    let handle = ControllerHandle {
        session_id: id,
        tx,
        state_rx,
        events: controller.events.sender(),
    };
    tokio::spawn(controller.run(rx));

    Ok(Some(handle))
}

/// State owned by the controller task
struct PlaylistController {
    id: SessionId,
    config: ControllerConfig,
    session: PlaylistSession,
    resolver: SourceResolver,
    factory: Box<dyn SurfaceFactory>,
    /// Handle to the mounted surface, released only through `teardown`
    surface: Option<Box<dyn MountedSurface>>,
    mount_id: Option<MountId>,
    mounts: u64,
    tickets: u64,
    auto_advance: Option<PendingTimer>,
    load_timeout: Option<PendingTimer>,
    is_playing: bool,
    is_muted: bool,
    closed: bool,
    /// Weak so that dropping every handle ends the task
    commands: WeakUnboundedSender<Command>,
    events: EventBus,
    state_tx: watch::Sender<Snapshot>,
}

impl PlaylistController {
    async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        if !self.closed {
            debug!(session = %self.id, "All handles dropped");
            self.shutdown();
        }
        debug!(session = %self.id, "Controller task finished");
    }

    /// Apply one command. Returns false once the session is closed.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Next(reply) => {
                let result = self.next();
                self.respond(reply, result);
            }
            Command::Previous(reply) => {
                let result = self.previous();
                self.respond(reply, result);
            }
            Command::Select(index, reply) => {
                let result = self.select_index(index);
                self.respond(reply, result);
            }
            Command::Retry(reply) => {
                let result = self.retry();
                self.respond(reply, result);
            }
            Command::ToggleSidebar(reply) => {
                let visible = self.session.toggle_sidebar();
                self.events.emit(PlaylistEvent::SidebarToggled { visible });
                self.respond(reply, Ok(visible));
            }
            Command::TogglePlay(reply) => {
                let result = self.toggle_play();
                self.respond(reply, result);
            }
            Command::ToggleMute(reply) => {
                let result = self.toggle_mute();
                self.respond(reply, result);
            }
            Command::ExternalUrl(reply) => {
                let url = self.config.external_link_for(self.session.active_item());
                let _ = reply.send(Ok(url));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Command::Close(reply) => {
                self.shutdown();
                let _ = reply.send(Ok(()));
                return false;
            }
            Command::Signal { mount_id, signal } => {
                if let Err(err) = self.on_signal(mount_id, signal) {
                    warn!(session = %self.id, %mount_id, code = err.error_code(), error = %err, "Failed to apply surface signal");
                }
                self.publish();
            }
            Command::AutoAdvanceDue { ticket } => {
                if let Err(err) = self.on_auto_advance_due(ticket) {
                    warn!(session = %self.id, code = err.error_code(), error = %err, "Auto-advance failed");
                }
                self.publish();
            }
            Command::LoadTimeout { mount_id, ticket } => {
                if let Err(err) = self.on_load_timeout(mount_id, ticket) {
                    warn!(session = %self.id, code = err.error_code(), error = %err, "Load timeout handling failed");
                }
                self.publish();
            }
        }
        true
    }

    /// Publish the new state before answering, so callers observe it
    fn respond<T>(&mut self, reply: Reply<T>, result: Result<T>) {
        self.publish();
        let _ = reply.send(result);
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> Snapshot {
        let attempt = self.resolver.attempt();
        let active = if self.closed { None } else { self.session.active_item() };
        let status = attempt.map(|a| a.status());
        let surface = attempt.map(|a| a.surface_kind());

        Snapshot {
            session_id: self.id,
            item_count: self.session.len(),
            active_index: active.map(|_| self.session.active_index()),
            item_id: active.map(|item| item.id.clone()),
            title: active.map(|item| item.name.clone()),
            status,
            strategy: attempt.map(|a| a.strategy_index()),
            resolved_url: attempt.map(|a| a.resolved_url().clone()),
            surface,
            mount_id: self.mount_id,
            controls_available: self.mount_id.is_some()
                && surface == Some(SurfaceKind::NativeMedia)
                && status != Some(FallbackStatus::Exhausted),
            sidebar_visible: self.session.sidebar_visible(),
            is_playing: self.is_playing,
            is_muted: self.is_muted,
            remaining: if self.closed { 0 } else { self.session.remaining() },
            auto_advance_pending: self.auto_advance.is_some(),
            closed: self.closed,
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn next(&mut self) -> Result<()> {
        self.cancel_auto_advance();
        if self.session.next() {
            self.activate_current()?;
        } else {
            debug!(session = %self.id, "Already at last item");
        }
        Ok(())
    }

    fn previous(&mut self) -> Result<()> {
        self.cancel_auto_advance();
        if self.session.previous() {
            self.activate_current()?;
        } else {
            debug!(session = %self.id, "Already at first item");
        }
        Ok(())
    }

    fn select_index(&mut self, index: usize) -> Result<()> {
        self.session.select_index(index)?;
        self.cancel_auto_advance();
        self.activate_current()
    }

    /// Reset the fallback state for the active item and mount its first source
    fn activate_current(&mut self) -> Result<()> {
        self.cancel_auto_advance();
        self.cancel_load_timeout();

        let item = self.session.active_item().cloned().ok_or(Error::EmptyPlaylist)?;
        let index = self.session.active_index();

        self.resolver.activate(&item)?;

        info!(session = %self.id, index, item = %item.id, name = %item.name, "Item activated");
        self.events.emit(PlaylistEvent::ItemActivated {
            index,
            item_id: item.id,
        });

        self.remount()
    }

    // ------------------------------------------------------------------
    // Surfaces
    // ------------------------------------------------------------------

    fn allocate_mount_id(&mut self) -> MountId {
        self.mounts += 1;
        MountId(self.mounts)
    }

    /// Playback state belongs to the surface and goes with it
    fn teardown_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            debug!(session = %self.id, mount_id = ?self.mount_id, "Tearing down surface");
            surface.teardown();
        }
        self.mount_id = None;
        self.set_playing(false);
    }

    /// Replace whatever is mounted with a surface for the current attempt.
    ///
    /// A mount error counts as a load failure of that source.
    fn remount(&mut self) -> Result<()> {
        self.cancel_load_timeout();
        self.teardown_surface();

        loop {
            let mount_id = self.allocate_mount_id();
            let Some(attempt) = self.resolver.attempt() else {
                return Ok(());
            };
            let request = MountRequest {
                mount_id,
                item_id: attempt.item_id().to_string(),
                item_name: self
                    .session
                    .active_item()
                    .map(|item| item.name.clone())
                    .unwrap_or_default(),
                url: attempt.resolved_url().clone(),
                kind: attempt.surface_kind(),
                strategy: attempt.strategy(),
                autoplay: true,
                muted: self.is_muted,
            };

            let sink = SignalSink::new(mount_id, self.commands.clone());
            let mounted = self.factory.mount(&request, sink);

            let before = self.resolver.status();
            self.resolver.begin_attempt();
            self.note_status(before);

            match mounted {
                Ok(surface) => {
                    info!(
                        session = %self.id,
                        %mount_id,
                        item = %request.item_id,
                        strategy = %request.strategy,
                        surface = %request.kind,
                        url = %request.url,
                        "Surface mounted"
                    );
                    self.surface = Some(surface);
                    self.mount_id = Some(mount_id);
                    self.events.emit(PlaylistEvent::SourceMounted {
                        mount_id,
                        item_id: request.item_id,
                        strategy: request.strategy.index(),
                        surface: request.kind,
                        url: request.url,
                    });
                    self.arm_load_timeout(mount_id);
                    return Ok(());
                }
                Err(err) => {
                    warn!(session = %self.id, %mount_id, code = err.error_code(), error = %err, "Surface mount failed");
                    let before = self.resolver.status();
                    let transition = self.resolver.on_load_failure()?;
                    self.note_status(before);
                    match transition {
                        Transition::Remount => continue,
                        Transition::Exhausted => {
                            self.on_exhausted();
                            return Ok(());
                        }
                        Transition::Settled | Transition::Ignored => return Ok(()),
                    }
                }
            }
        }
    }

    fn note_status(&mut self, before: Option<FallbackStatus>) {
        let Some(attempt) = self.resolver.attempt() else {
            return;
        };
        let (Some(from), to) = (before, attempt.status()) else {
            return;
        };
        if from != to {
            let item_id = attempt.item_id().to_string();
            debug!(session = %self.id, item = %item_id, %from, %to, "Fallback status changed");
            self.events.emit(PlaylistEvent::StatusChanged { item_id, from, to });
        }
    }

    fn on_exhausted(&mut self) {
        self.cancel_load_timeout();
        self.teardown_surface();
        if let Some(attempt) = self.resolver.attempt() {
            let item_id = attempt.item_id().to_string();
            warn!(session = %self.id, item = %item_id, "Playback unavailable, manual retry required");
            self.events.emit(PlaylistEvent::Exhausted { item_id });
        }
    }

    // ------------------------------------------------------------------
    // Surface signals
    // ------------------------------------------------------------------

    fn on_signal(&mut self, mount_id: MountId, signal: SurfaceSignal) -> Result<()> {
        if self.mount_id != Some(mount_id) {
            debug!(session = %self.id, %mount_id, ?signal, "Discarding signal from stale surface");
            return Ok(());
        }

        match signal {
            SurfaceSignal::Loaded => {
                self.cancel_load_timeout();
                let before = self.resolver.status();
                self.resolver.on_load_success();
                self.note_status(before);
            }
            SurfaceSignal::Failed => self.fail_current()?,
            SurfaceSignal::Ended => {
                self.set_playing(false);
                self.schedule_auto_advance();
            }
            SurfaceSignal::Playing => self.set_playing(true),
            SurfaceSignal::Paused => self.set_playing(false),
        }
        Ok(())
    }

    fn fail_current(&mut self) -> Result<()> {
        self.cancel_load_timeout();
        let before = self.resolver.status();
        let transition = self.resolver.on_load_failure()?;
        self.note_status(before);
        match transition {
            Transition::Remount => self.remount(),
            Transition::Exhausted => {
                self.on_exhausted();
                Ok(())
            }
            Transition::Settled | Transition::Ignored => Ok(()),
        }
    }

    fn retry(&mut self) -> Result<()> {
        self.cancel_load_timeout();
        let before = self.resolver.status();
        if self.resolver.retry()? != Transition::Remount {
            return Ok(());
        }
        self.note_status(before);
        self.publish();
        self.remount()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn next_ticket(&mut self) -> u64 {
        self.tickets += 1;
        self.tickets
    }

    fn spawn_timer(&self, delay: Duration, command: Command) -> JoinHandle<()> {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(command);
            }
        })
    }

    fn schedule_auto_advance(&mut self) {
        if self.session.is_last() {
            info!(session = %self.id, "Last item ended, staying put");
            return;
        }
        if let Some(pending) = self.auto_advance.take() {
            pending.task.abort();
        }

        let delay = self.config.auto_advance_delay();
        let ticket = self.next_ticket();
        let task = self.spawn_timer(delay, Command::AutoAdvanceDue { ticket });
        self.auto_advance = Some(PendingTimer { ticket, task });

        let from_index = self.session.active_index();
        debug!(session = %self.id, from_index, delay_ms = self.config.auto_advance_delay_ms, "Auto-advance scheduled");
        self.events.emit(PlaylistEvent::AutoAdvanceScheduled {
            from_index,
            delay_ms: self.config.auto_advance_delay_ms,
        });
    }

    fn cancel_auto_advance(&mut self) {
        if let Some(pending) = self.auto_advance.take() {
            pending.task.abort();
            debug!(session = %self.id, "Auto-advance cancelled");
            self.events.emit(PlaylistEvent::AutoAdvanceCancelled);
        }
    }

    fn on_auto_advance_due(&mut self, ticket: u64) -> Result<()> {
        match self.auto_advance.take() {
            Some(pending) if pending.ticket == ticket => {
                info!(session = %self.id, "Auto-advancing to next item");
                if self.session.next() {
                    self.activate_current()?;
                }
            }
            other => {
                debug!(session = %self.id, ticket, "Discarding superseded auto-advance");
                self.auto_advance = other;
            }
        }
        Ok(())
    }

    fn arm_load_timeout(&mut self, mount_id: MountId) {
        let Some(timeout) = self.config.load_timeout() else {
            return;
        };
        let ticket = self.next_ticket();
        let task = self.spawn_timer(timeout, Command::LoadTimeout { mount_id, ticket });
        self.load_timeout = Some(PendingTimer { ticket, task });
    }

    fn cancel_load_timeout(&mut self) {
        if let Some(pending) = self.load_timeout.take() {
            pending.task.abort();
        }
    }

    fn on_load_timeout(&mut self, mount_id: MountId, ticket: u64) -> Result<()> {
        let current = matches!(&self.load_timeout, Some(pending) if pending.ticket == ticket);
        if !current || self.mount_id != Some(mount_id) {
            debug!(session = %self.id, %mount_id, "Discarding stale load timeout");
            return Ok(());
        }
        self.load_timeout = None;

        let Some(attempt) = self.resolver.attempt() else {
            return Ok(());
        };
        if !attempt.status().is_loading() {
            return Ok(());
        }
        let strategy = attempt.strategy_index();
        warn!(session = %self.id, %mount_id, strategy, "Load attempt timed out");
        self.events.emit(PlaylistEvent::LoadTimedOut { mount_id, strategy });
        self.fail_current()
    }

    // ------------------------------------------------------------------
    // Playback controls
    // ------------------------------------------------------------------

    fn native_surface(&mut self) -> Result<&mut Box<dyn MountedSurface>> {
        let attempt = self.resolver.attempt().ok_or(Error::NoSurface)?;
        let kind = attempt.surface_kind();
        if kind != SurfaceKind::NativeMedia || attempt.status() == FallbackStatus::Exhausted {
            return Err(Error::ControlsUnavailable {
                surface: kind.to_string(),
            });
        }
        self.surface.as_mut().ok_or(Error::NoSurface)
    }

    fn toggle_play(&mut self) -> Result<bool> {
        let playing = self.is_playing;
        let surface = self.native_surface()?;
        if playing {
            surface.pause()?;
        } else {
            surface.play()?;
        }
        self.set_playing(!playing);
        Ok(!playing)
    }

    fn toggle_mute(&mut self) -> Result<bool> {
        let muted = !self.is_muted;
        self.native_surface()?.set_muted(muted)?;
        self.is_muted = muted;
        self.events.emit(PlaylistEvent::MuteChanged { muted });
        Ok(muted)
    }

    fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            self.is_playing = playing;
            self.events.emit(PlaylistEvent::PlaybackChanged { playing });
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        info!(session = %self.id, "Closing playlist");
        self.cancel_auto_advance();
        self.cancel_load_timeout();
        self.teardown_surface();
        self.resolver.clear();
        self.closed = true;
        self.events.emit(PlaylistEvent::Closed);
        self.publish();
    }
}

/// Cloneable handle to an open playlist
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    session_id: SessionId,
    tx: UnboundedSender<Command>,
    state_rx: watch::Receiver<Snapshot>,
    events: broadcast::Sender<EventRecord>,
}

impl ControllerHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Latest published snapshot, without a round trip
    pub fn current(&self) -> Snapshot {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state_rx.clone()
    }

    /// Subscribe to events emitted from now on
    pub fn events(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// Snapshot taken after every previously queued command and signal
    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(Command::Snapshot).await
    }

    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn next(&self) -> Result<()> {
        self.request(Command::Next).await
    }

    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn previous(&self) -> Result<()> {
        self.request(Command::Previous).await
    }

    /// Make `index` active; re-selecting the active item replays it
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn select_index(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::Select(index, reply)).await
    }

    /// Restart the active item from the first strategy
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn retry(&self) -> Result<()> {
        self.request(Command::Retry).await
    }

    /// Returns the new visibility
    pub async fn toggle_sidebar(&self) -> Result<bool> {
        self.request(Command::ToggleSidebar).await
    }

    /// Play or pause a native surface. Returns true if now playing.
    pub async fn toggle_play(&self) -> Result<bool> {
        self.request(Command::TogglePlay).await
    }

    /// Returns true if now muted
    pub async fn toggle_mute(&self) -> Result<bool> {
        self.request(Command::ToggleMute).await
    }

    /// Target of the "open externally" action
    pub async fn external_url(&self) -> Result<Url> {
        self.request(Command::ExternalUrl).await
    }

    /// Close the session: timers are cancelled and the surface torn down
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn close(&self) -> Result<()> {
        self.request(Command::Close).await
    }
}
