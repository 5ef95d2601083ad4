//! Integration tests for Driveplay Core

use driveplay_core::{
    open_playlist, ControllerConfig, ControllerHandle, Error, ExternalLinkPolicy, FallbackStatus,
    MountLog, PlayableItem, PlaylistEvent, ScriptStep, ScriptedSurfaceFactory, Snapshot,
    SurfaceKind,
};
use driveplay_core::scripted::ControlCall;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use url::Url;

// =============================================================================
// Helpers
// =============================================================================

fn items(n: usize) -> Vec<PlayableItem> {
    (0..n)
        .map(|i| PlayableItem::new(format!("item-{}", i), format!("Video {}", i)))
        .collect()
}

fn open_manual(n: usize, initial: Option<&str>) -> (ControllerHandle, MountLog) {
    open_with(items(n), initial, ControllerConfig::default())
}

fn open_with(
    items: Vec<PlayableItem>,
    initial: Option<&str>,
    config: ControllerConfig,
) -> (ControllerHandle, MountLog) {
    let factory = ScriptedSurfaceFactory::manual();
    let log = factory.log();
    let handle = open_playlist(items, initial, config, factory)
        .unwrap()
        .expect("non-empty playlist opens");
    (handle, log)
}

/// Fail the currently mounted surface and wait for the controller to react
async fn fail_latest(handle: &ControllerHandle, log: &MountLog) -> Snapshot {
    log.latest().unwrap().sink.failed();
    handle.snapshot().await.unwrap()
}

async fn wait_until(handle: &ControllerHandle, pred: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("condition reached in time")
        .expect("controller still publishing")
        .clone();
    snapshot
}

// =============================================================================
// Playlist Navigation
// =============================================================================

#[tokio::test]
async fn test_sequential_next_saturates_at_last_item() {
    let (handle, _log) = open_manual(3, None);
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(0));

    handle.next().await.unwrap();
    handle.next().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(2));

    handle.next().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(2));
    assert_eq!(snapshot.remaining, 0);
}

#[tokio::test]
async fn test_previous_saturates_at_first_item() {
    let (handle, log) = open_manual(3, None);
    let mounts = log.len();

    handle.previous().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(0));
    // A no-op navigation does not re-mount
    assert_eq!(log.len(), mounts);
}

#[tokio::test]
async fn test_open_with_initial_item() {
    let items = vec![
        PlayableItem::new("a", "A"),
        PlayableItem::new("b", "B"),
        PlayableItem::new("c", "C"),
    ];
    let (handle, log) = open_with(items, Some("b"), ControllerConfig::default());

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.title.as_deref(), Some("B"));
    assert_eq!(log.latest().unwrap().request.item_id, "b");
}

#[tokio::test]
async fn test_empty_playlist_is_not_opened() {
    let handle = open_playlist(
        Vec::<PlayableItem>::new(),
        None,
        ControllerConfig::default(),
        ScriptedSurfaceFactory::manual(),
    )
    .unwrap();
    assert!(handle.is_none());
}

#[tokio::test]
async fn test_select_index_replays_and_rejects_out_of_range() {
    let (handle, log) = open_manual(3, None);
    handle.select_index(1).await.unwrap();
    let mounts = log.len();

    // Re-selecting the active item re-mounts it
    assert_ok!(handle.select_index(1).await);
    assert_eq!(log.len(), mounts + 1);
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(1));

    let err = handle.select_index(3).await.unwrap_err();
    assert!(matches!(err, Error::InvalidIndex { index: 3, len: 3 }));
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(1));
}

#[tokio::test]
async fn test_sidebar_toggle_leaves_playback_alone() {
    let (handle, log) = open_manual(2, None);
    log.latest().unwrap().sink.loaded();
    let before = handle.snapshot().await.unwrap();
    assert!(before.sidebar_visible);

    assert!(!handle.toggle_sidebar().await.unwrap());
    let after = handle.snapshot().await.unwrap();
    assert!(!after.sidebar_visible);
    assert_eq!(after.status, before.status);
    assert_eq!(after.mount_id, before.mount_id);
}

// =============================================================================
// Source Fallback
// =============================================================================

#[tokio::test]
async fn test_third_failure_switches_to_embedded_document() {
    let (handle, log) = open_manual(1, None);
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.surface, Some(SurfaceKind::NativeMedia));
    assert!(snapshot.controls_available);

    fail_latest(&handle, &log).await;
    fail_latest(&handle, &log).await;
    let snapshot = fail_latest(&handle, &log).await;

    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(3)));
    assert_eq!(snapshot.surface, Some(SurfaceKind::EmbeddedDocument));
    assert!(!snapshot.controls_available);

    let latest = log.latest().unwrap();
    assert_eq!(latest.request.kind, SurfaceKind::EmbeddedDocument);
    assert_eq!(
        latest.request.url.as_str(),
        "https://drive.google.com/uc?export=preview&id=item-0"
    );
    // Only the newest surface is still mounted
    assert_eq!(log.live().len(), 1);
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn test_exhaustion_then_manual_retry() {
    let (handle, log) = open_manual(1, None);
    let mut events = handle.events();

    for _ in 0..4 {
        fail_latest(&handle, &log).await;
    }
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Exhausted));
    assert_eq!(snapshot.mount_id, None);
    assert!(log.live().is_empty());

    // A fifth failure has no effect
    let snapshot = fail_latest(&handle, &log).await;
    assert_eq!(snapshot.status, Some(FallbackStatus::Exhausted));
    assert_eq!(log.len(), 4);

    handle.retry().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));
    assert_eq!(snapshot.strategy, Some(0));
    assert_eq!(
        snapshot.resolved_url.unwrap().as_str(),
        "https://drive.google.com/file/d/item-0/preview?quality=hd1080"
    );
    assert_eq!(log.len(), 5);

    let mut saw_exhausted = false;
    let mut saw_retrying = false;
    while let Ok(record) = events.try_recv() {
        match record.event {
            PlaylistEvent::Exhausted { .. } => saw_exhausted = true,
            PlaylistEvent::StatusChanged { to: FallbackStatus::Retrying, .. } => saw_retrying = true,
            _ => {}
        }
    }
    assert!(saw_exhausted);
    assert!(saw_retrying);
}

#[tokio::test]
async fn test_retry_while_loading_remounts_first_strategy() {
    let (handle, log) = open_manual(1, None);
    fail_latest(&handle, &log).await;
    let old = log.latest().unwrap();

    handle.retry().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));
    assert!(old.is_torn_down());
    assert_ne!(log.latest().unwrap().request.mount_id, old.request.mount_id);
}

#[tokio::test]
async fn test_settled_survives_later_failure_signal() {
    let (handle, log) = open_manual(1, None);
    fail_latest(&handle, &log).await;
    log.latest().unwrap().sink.loaded();
    let snapshot = fail_latest(&handle, &log).await;

    assert_eq!(snapshot.status, Some(FallbackStatus::Settled));
    assert_eq!(snapshot.strategy, Some(1));
}

#[tokio::test]
async fn test_fallback_resets_on_item_change() {
    let (handle, log) = open_manual(3, None);
    fail_latest(&handle, &log).await;
    fail_latest(&handle, &log).await;
    assert_eq!(handle.snapshot().await.unwrap().strategy, Some(2));

    handle.next().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));

    handle.previous().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().status, Some(FallbackStatus::Loading(0)));
}

#[tokio::test]
async fn test_replaying_active_item_resets_fallback() {
    let (handle, log) = open_manual(3, Some("item-1"));
    fail_latest(&handle, &log).await;
    let snapshot = fail_latest(&handle, &log).await;
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(2)));

    handle.select_index(1).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));
    assert_eq!(snapshot.strategy, Some(0));
    assert_eq!(log.latest().unwrap().request.strategy.index(), 0);
    assert_eq!(log.live().len(), 1);
}

#[tokio::test]
async fn test_signals_from_replaced_surface_are_ignored() {
    let (handle, log) = open_manual(1, None);
    let first = log.latest().unwrap();
    fail_latest(&handle, &log).await;

    first.sink.loaded();
    first.sink.failed();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(1)));
}

#[tokio::test]
async fn test_failure_events_are_ordered() {
    let (handle, log) = open_manual(1, None);
    let mut events = handle.events();
    fail_latest(&handle, &log).await;

    let first = events.try_recv().unwrap();
    let second = events.try_recv().unwrap();
    assert!(first.sequence < second.sequence);
    assert!(matches!(
        first.event,
        PlaylistEvent::StatusChanged {
            from: FallbackStatus::Loading(0),
            to: FallbackStatus::Loading(1),
            ..
        }
    ));
    assert!(matches!(second.event, PlaylistEvent::SourceMounted { strategy: 1, .. }));
}

// =============================================================================
// Scripted Surfaces
// =============================================================================

#[tokio::test]
async fn test_scripted_fallback_settles() {
    let factory = ScriptedSurfaceFactory::new(
        [ScriptStep::Fail, ScriptStep::Fail, ScriptStep::Load],
        ScriptStep::Silent,
    );
    let log = factory.log();
    let handle = open_playlist(items(1), None, ControllerConfig::default(), factory)
        .unwrap()
        .unwrap();

    let snapshot = wait_until(&handle, |s| s.status == Some(FallbackStatus::Settled)).await;
    assert_eq!(snapshot.strategy, Some(2));
    assert_eq!(log.len(), 3);
}

#[tokio::test]
async fn test_mount_rejection_counts_as_failure() {
    let factory = ScriptedSurfaceFactory::new([ScriptStep::Reject], ScriptStep::Load);
    let log = factory.log();
    let handle = open_playlist(items(1), None, ControllerConfig::default(), factory)
        .unwrap()
        .unwrap();

    let snapshot = wait_until(&handle, |s| s.status == Some(FallbackStatus::Settled)).await;
    assert_eq!(snapshot.strategy, Some(1));
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn test_rejecting_every_mount_exhausts() {
    let factory = ScriptedSurfaceFactory::new(Vec::new(), ScriptStep::Reject);
    let handle = open_playlist(items(1), None, ControllerConfig::default(), factory)
        .unwrap()
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Exhausted));
    assert_eq!(snapshot.mount_id, None);
}

// =============================================================================
// Auto-advance
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_auto_advance_after_natural_end() {
    let (handle, log) = open_manual(3, None);
    let sink = log.latest().unwrap().sink;
    sink.loaded();
    sink.ended();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(0));
    assert!(snapshot.auto_advance_pending);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));
    assert!(!snapshot.auto_advance_pending);
    assert_eq!(log.latest().unwrap().request.item_id, "item-1");
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_waits_for_delay() {
    let (handle, log) = open_manual(2, None);
    log.latest().unwrap().sink.ended();

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(0));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_end_on_last_item_stays_put() {
    let (handle, log) = open_manual(2, Some("item-1"));
    log.latest().unwrap().sink.loaded();
    log.latest().unwrap().sink.ended();

    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.auto_advance_pending);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.status, Some(FallbackStatus::Settled));
}

#[tokio::test(start_paused = true)]
async fn test_manual_navigation_supersedes_auto_advance() {
    let (handle, log) = open_manual(3, None);
    log.latest().unwrap().sink.loaded();
    log.latest().unwrap().sink.ended();
    handle.snapshot().await.unwrap();

    handle.next().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(1));

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert!(!snapshot.auto_advance_pending);
}

#[tokio::test(start_paused = true)]
async fn test_previous_at_start_still_cancels_auto_advance() {
    let (handle, log) = open_manual(3, None);
    log.latest().unwrap().sink.ended();
    handle.snapshot().await.unwrap();

    handle.previous().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.snapshot().await.unwrap().active_index, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_auto_advance() {
    let (handle, log) = open_manual(3, None);
    let mounted = log.latest().unwrap();
    mounted.sink.ended();
    handle.snapshot().await.unwrap();

    handle.close().await.unwrap();
    assert!(mounted.is_torn_down());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(log.len(), 1);

    let state = handle.subscribe().borrow().clone();
    assert!(state.closed);
    assert_eq!(state.active_index, None);
    assert!(matches!(handle.snapshot().await, Err(Error::SessionClosed)));
    assert_err!(handle.next().await);
}

// =============================================================================
// Load Timeout
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_load_timeout_synthesizes_failure() {
    let (handle, log) = open_manual(1, None);
    let mut events = handle.events();

    tokio::time::sleep(Duration::from_millis(8100)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(1)));
    assert_eq!(log.len(), 2);

    let timed_out = std::iter::from_fn(|| events.try_recv().ok())
        .any(|r| matches!(r.event, PlaylistEvent::LoadTimedOut { strategy: 0, .. }));
    assert!(timed_out);
}

#[tokio::test(start_paused = true)]
async fn test_silent_surfaces_exhaust_through_timeouts() {
    let (handle, _log) = open_manual(1, None);
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(handle.snapshot().await.unwrap().status, Some(FallbackStatus::Exhausted));
}

#[tokio::test(start_paused = true)]
async fn test_load_success_disarms_timeout() {
    let (handle, log) = open_manual(1, None);
    log.latest().unwrap().sink.loaded();
    handle.snapshot().await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Settled));
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_can_be_disabled() {
    let config = ControllerConfig {
        load_timeout_ms: None,
        ..Default::default()
    };
    let (handle, _log) = open_with(items(1), None, config);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot().await.unwrap().status, Some(FallbackStatus::Loading(0)));
}

// =============================================================================
// Controls and External Link
// =============================================================================

#[tokio::test]
async fn test_controls_only_on_native_surface() {
    let (handle, log) = open_manual(1, None);
    log.latest().unwrap().sink.loaded();

    assert!(handle.toggle_play().await.unwrap());
    assert!(handle.toggle_mute().await.unwrap());
    assert!(!handle.toggle_play().await.unwrap());
    assert_eq!(
        log.latest().unwrap().controls(),
        vec![ControlCall::Play, ControlCall::Mute(true), ControlCall::Pause]
    );

    handle.retry().await.unwrap();
    for _ in 0..3 {
        fail_latest(&handle, &log).await;
    }
    let err = handle.toggle_play().await.unwrap_err();
    assert!(matches!(err, Error::ControlsUnavailable { .. }));
}

#[tokio::test]
async fn test_playing_signal_updates_snapshot() {
    let (handle, log) = open_manual(2, None);
    log.latest().unwrap().sink.playing();
    assert!(handle.snapshot().await.unwrap().is_playing);

    handle.next().await.unwrap();
    assert!(!handle.snapshot().await.unwrap().is_playing);
}

#[tokio::test]
async fn test_retry_while_playing_resets_playback_state() {
    let (handle, log) = open_manual(1, None);
    log.latest().unwrap().sink.loaded();
    log.latest().unwrap().sink.playing();
    assert!(handle.snapshot().await.unwrap().is_playing);

    handle.retry().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(0)));
    assert!(!snapshot.is_playing);

    // The fresh surface never reported playing, so the toggle starts it
    assert!(handle.toggle_play().await.unwrap());
    assert_eq!(log.latest().unwrap().controls(), vec![ControlCall::Play]);
}

#[tokio::test]
async fn test_fallback_remount_resets_playing() {
    let (handle, log) = open_manual(1, None);
    let first = log.latest().unwrap();
    first.sink.playing();
    first.sink.failed();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, Some(FallbackStatus::Loading(1)));
    assert!(!snapshot.is_playing);
}

#[tokio::test]
async fn test_mute_carries_over_to_next_surface() {
    let (handle, log) = open_manual(2, None);
    log.latest().unwrap().sink.loaded();
    assert!(handle.toggle_mute().await.unwrap());

    handle.next().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    let mounted = log.latest().unwrap();
    assert!(snapshot.is_muted);
    assert!(mounted.request.muted);
    assert!(mounted.is_muted());

    assert!(!handle.toggle_mute().await.unwrap());
    assert!(!mounted.is_muted());
    assert_eq!(mounted.controls(), vec![ControlCall::Mute(false)]);
    assert!(!handle.snapshot().await.unwrap().is_muted);
}

#[tokio::test]
async fn test_unmuted_playlist_mounts_with_sound() {
    let (handle, log) = open_manual(2, None);
    handle.next().await.unwrap();
    assert!(!log.latest().unwrap().request.muted);
    assert!(!handle.snapshot().await.unwrap().is_muted);
}

#[tokio::test]
async fn test_external_url_is_fixed_by_default() {
    let link = Url::parse("https://drive.google.com/file/d/item-0/view").unwrap();
    let items = vec![PlayableItem::new("item-0", "Video 0").with_web_view_link(link.clone())];

    let (handle, _log) = open_with(items.clone(), None, ControllerConfig::default());
    assert_eq!(
        handle.external_url().await.unwrap().as_str(),
        "https://www.youtube.com/@ApnaCollegeOfficial"
    );

    let config = ControllerConfig {
        external_link_policy: ExternalLinkPolicy::ActiveItem,
        ..Default::default()
    };
    let (handle, _log) = open_with(items, None, config);
    assert_eq!(handle.external_url().await.unwrap(), link);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_tears_down_surface() {
    let (handle, log) = open_manual(1, None);
    let mounted = log.latest().unwrap();
    let observer = handle.subscribe();

    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(mounted.is_torn_down());
    assert!(observer.borrow().closed);
    assert!(!mounted.sink.loaded());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = ControllerConfig {
        event_capacity: 0,
        ..Default::default()
    };
    let result = open_playlist(items(1), None, config, ScriptedSurfaceFactory::manual());
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
