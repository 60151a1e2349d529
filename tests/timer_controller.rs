use std::{num::NonZeroU32, sync::Arc, time::Duration};

use focus_timer::{
    notifications::{InMemoryHost, NotificationGateway, NotificationHost},
    state::{HandlerPolicy, Notice},
    NotificationError, TimerController, TimerError,
};
use tokio::time::sleep;

fn minutes(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

async fn setup(host: InMemoryHost, initial: u32) -> (Arc<InMemoryHost>, Arc<NotificationGateway>, TimerController) {
    let host = Arc::new(host);
    let gateway = Arc::new(NotificationGateway::new(
        Arc::clone(&host) as Arc<dyn NotificationHost>,
        HandlerPolicy::default(),
    ));
    gateway.initialize().await;
    let controller = TimerController::new(Arc::clone(&gateway), minutes(initial));
    (host, gateway, controller)
}

/// Sleep past `ticks` one-second ticks without landing on a tick boundary
async fn ticks(ticks: u64) {
    sleep(Duration::from_millis(ticks * 1000 + 500)).await;
}

#[tokio::test(start_paused = true)]
async fn start_counts_from_the_configured_duration() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    for m in [1, 7, 25, 90] {
        controller.set_configured_minutes(minutes(m)).unwrap();
        let state = controller.start().await.unwrap();
        assert!(state.running);
        assert_eq!(state.remaining_seconds, u64::from(m) * 60);

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.active_tick_sources, 1);
        assert_eq!(snapshot.scheduled.unwrap().fire_after_seconds, u64::from(m) * 60);

        controller.stop().await.unwrap();
    }

    assert_eq!(host.scheduled().len(), 4);
    assert_eq!(host.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_input_leaves_the_timer_idle() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;
    let before = controller.state().unwrap();

    for input in ["-5", "0", "abc", ""] {
        let err = controller.toggle(input).await.unwrap_err();
        assert!(matches!(err, TimerError::InvalidDuration(_)));
        assert!(matches!(err.notice(), Notice::Alert(_)));
        assert_eq!(controller.state().unwrap(), before);
    }

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.active_tick_sources, 0);
    assert!(snapshot.scheduled.is_none());
    assert!(host.scheduled().is_empty());
}

#[tokio::test(start_paused = true)]
async fn runs_to_completion_and_clears_the_tick_source_once() {
    let (host, gateway, controller) = setup(InMemoryHost::new(), 25).await;

    let state = controller.toggle("25").await.unwrap();
    assert_eq!(state.remaining_seconds, 1500);

    ticks(1500).await;

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.timer.remaining_seconds, 0);
    assert!(!snapshot.timer.running);
    assert_eq!(snapshot.active_tick_sources, 0);
    assert_eq!(snapshot.tick_sources_cleared, 1);
    assert!(snapshot.scheduled.is_none());

    // Natural completion does not cancel: only the safety cancel before scheduling ran
    assert_eq!(host.cancel_calls(), 1);
    assert_eq!(host.delivered().len(), 1);
    assert_eq!(gateway.observed().received(), 1);

    // Nothing keeps ticking afterwards
    ticks(5).await;
    assert_eq!(controller.snapshot().unwrap().tick_sources_cleared, 1);
    assert_eq!(controller.state().unwrap().remaining_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn stop_freezes_remaining_time_and_cancels_the_notification() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    controller.start().await.unwrap();
    ticks(10).await;

    let stopped = controller.stop().await.unwrap();
    assert!(!stopped.running);
    assert_eq!(stopped.remaining_seconds, 1500 - 10);
    assert_eq!(host.pending_count(), 0);
    assert_eq!(host.cancel_calls(), 2);

    ticks(5).await;
    assert_eq!(controller.state().unwrap().remaining_seconds, 1490);

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.active_tick_sources, 0);
    assert_eq!(snapshot.tick_sources_cleared, 1);
    assert!(snapshot.scheduled.is_none());
    assert!(host.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stopping_twice_is_the_same_as_stopping_once() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 5).await;

    controller.start().await.unwrap();
    ticks(3).await;

    let first = controller.stop().await.unwrap();
    let cancels = host.cancel_calls();
    let second = controller.stop().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(host.cancel_calls(), cancels);
    assert_eq!(controller.snapshot().unwrap().tick_sources_cleared, 1);
}

#[tokio::test(start_paused = true)]
async fn toggle_stops_a_running_timer() {
    let (_host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    assert!(controller.toggle("1").await.unwrap().running);
    ticks(2).await;
    let state = controller.toggle("ignored while running").await.unwrap();
    assert!(!state.running);
    assert_eq!(state.remaining_seconds, 58);
}

#[tokio::test(start_paused = true)]
async fn reentrant_start_is_rejected() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    controller.start().await.unwrap();
    ticks(2).await;

    assert!(matches!(controller.start().await, Err(TimerError::AlreadyRunning)));

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.active_tick_sources, 1);
    assert_eq!(snapshot.timer.remaining_seconds, 1498);
    assert_eq!(host.scheduled().len(), 1);

    // One tick source means one decrement per second
    ticks(3).await;
    assert_eq!(controller.state().unwrap().remaining_seconds, 1495);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_uses_a_fresh_tick_source() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 1).await;

    controller.start().await.unwrap();
    ticks(20).await;
    controller.stop().await.unwrap();

    let state = controller.start().await.unwrap();
    assert_eq!(state.remaining_seconds, 60);
    ticks(4).await;
    assert_eq!(controller.state().unwrap().remaining_seconds, 56);
    assert_eq!(host.pending_count(), 1);
    assert_eq!(controller.snapshot().unwrap().active_tick_sources, 1);
}

#[tokio::test(start_paused = true)]
async fn duration_changes_are_rejected_while_running() {
    let (_host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    controller.start().await.unwrap();
    assert!(matches!(
        controller.set_configured_duration("10"),
        Err(TimerError::NotIdle)
    ));
    assert_eq!(controller.state().unwrap().configured_duration_seconds, 1500);
}

#[tokio::test(start_paused = true)]
async fn denied_permission_runs_in_degraded_mode() {
    let (host, gateway, controller) = setup(InMemoryHost::new().denying(), 1).await;
    assert!(!gateway.registration().unwrap().permission_granted());

    let mut notices = controller.notices();
    let state = controller.start().await.unwrap();
    assert!(state.running);
    assert!(matches!(notices.try_recv(), Ok(Notice::Advisory(_))));

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.active_tick_sources, 1);
    assert!(snapshot.scheduled.is_none());
    assert!(host.scheduled().is_empty());

    ticks(60).await;
    let state = controller.state().unwrap();
    assert_eq!(state.remaining_seconds, 0);
    assert!(!state.running);
}

#[tokio::test(start_paused = true)]
async fn incapable_host_runs_in_degraded_mode() {
    let (host, _gateway, controller) = setup(InMemoryHost::new().incapable(), 2).await;

    assert!(controller.start().await.unwrap().running);
    assert!(host.scheduled().is_empty());
    assert_eq!(host.permission_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn scheduling_failure_rolls_back_to_idle() {
    let (host, _gateway, controller) =
        setup(InMemoryHost::new().pre_granted().failing_schedules(), 25).await;

    let err = controller.start().await.unwrap_err();
    assert!(matches!(
        err,
        TimerError::Scheduling(NotificationError::Host(_))
    ));

    let snapshot = controller.snapshot().unwrap();
    assert!(!snapshot.timer.running);
    assert_eq!(snapshot.timer.remaining_seconds, 1500);
    assert_eq!(snapshot.active_tick_sources, 0);
    assert!(snapshot.scheduled.is_none());
    assert_eq!(host.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn uninitialized_gateway_is_a_scheduling_failure() {
    let host: Arc<dyn NotificationHost> = Arc::new(InMemoryHost::new());
    let gateway = Arc::new(NotificationGateway::new(host, HandlerPolicy::default()));
    let controller = TimerController::new(gateway, minutes(5));

    assert!(matches!(
        controller.start().await,
        Err(TimerError::Scheduling(NotificationError::NotInitialized))
    ));
    assert!(!controller.is_running().unwrap());
}

#[tokio::test(start_paused = true)]
async fn shutdown_clears_the_tick_and_pending_notification() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;

    controller.start().await.unwrap();
    ticks(3).await;
    controller.shutdown().await;

    let snapshot = controller.snapshot().unwrap();
    assert!(!snapshot.timer.running);
    assert_eq!(snapshot.active_tick_sources, 0);
    assert!(snapshot.scheduled.is_none());
    assert_eq!(host.pending_count(), 0);

    ticks(10).await;
    assert_eq!(controller.state().unwrap().remaining_seconds, 1497);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_ends_the_tick_source() {
    let (_host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;
    let mut updates = controller.subscribe();

    controller.start().await.unwrap();
    updates.borrow_and_update();
    drop(controller);
    ticks(2).await;

    // The tick task held the last reference to the update channel
    assert!(updates.changed().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn every_tick_is_published() {
    let (_host, _gateway, controller) = setup(InMemoryHost::new(), 1).await;
    let mut updates = controller.subscribe();

    controller.start().await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().remaining_seconds, 60);

    updates.changed().await.unwrap();
    let state = updates.borrow_and_update().clone();
    assert_eq!(state.remaining_seconds, 59);
    assert_eq!(state.display(), "00:59");
}

#[tokio::test(start_paused = true)]
async fn duration_is_locked_while_a_slow_start_is_scheduling() {
    let (host, _gateway, controller) =
        setup(InMemoryHost::new().slow_schedules(Duration::from_millis(100)), 25).await;
    let controller = Arc::new(controller);

    let starting = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start().await }
    });
    sleep(Duration::from_millis(10)).await;

    assert!(matches!(
        controller.set_configured_minutes(minutes(1)),
        Err(TimerError::NotIdle)
    ));

    let state = starting.await.unwrap().unwrap();
    assert_eq!(state.configured_duration_seconds, 1500);
    assert_eq!(state.remaining_seconds, 1500);

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.scheduled.unwrap().fire_after_seconds, 1500);
    assert_eq!(host.scheduled()[0].after, Duration::from_secs(1500));
}

#[tokio::test(start_paused = true)]
async fn failed_cancel_on_stop_still_drops_the_scheduled_record() {
    let (host, _gateway, controller) = setup(InMemoryHost::new(), 25).await;
    let mut notices = controller.notices();

    controller.start().await.unwrap();
    host.fail_cancels(true);

    let state = controller.stop().await.unwrap();
    assert!(!state.running);
    assert!(matches!(notices.try_recv(), Ok(Notice::Advisory(_))));

    let snapshot = controller.snapshot().unwrap();
    assert!(snapshot.scheduled.is_none());
    assert_eq!(snapshot.active_tick_sources, 0);

    // The host still holds it; a later cancel clears it once the host recovers
    assert_eq!(host.pending_count(), 1);
    host.fail_cancels(false);
    controller.shutdown().await;
    assert_eq!(host.pending_count(), 0);
}
