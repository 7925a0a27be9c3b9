use std::time::Duration;

use tagshelf_scan::{
    ReaderOp, ScanConfig, ScanErrorKind, ScanEvent, ScanSessionController, ScanStatus,
    SimulatedReader, Tag, TagId,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;

fn spawn_controller(
    reader: &SimulatedReader,
    config: ScanConfig,
) -> (ScanSessionController, UnboundedReceiver<ScanEvent>) {
    let (events_tx, events) = mpsc::unbounded_channel::<ScanEvent>();
    let controller = ScanSessionController::spawn(reader.clone(), events_tx, config);
    (controller, events)
}

/// Wait for the next tag or error event, skipping state changes.
async fn next_outcome(events: &mut UnboundedReceiver<ScanEvent>) -> ScanEvent {
    loop {
        match events.recv().await.expect("controller closed") {
            ScanEvent::StateChanged(_) => continue,
            outcome => return outcome,
        }
    }
}

/// Drain everything already queued without waiting.
fn drain(events: &mut UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn tag(id: &str) -> TagId {
    TagId::new(id).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_tag_discovered_within_timeout() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    assert_eq!(controller.start().await.unwrap(), ScanStatus::Scanning);
    assert!(reader.present_tag("04A1B2"));

    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::TagDiscovered(tag("04A1B2"))
    );
    assert_eq!(controller.status(), ScanStatus::TagFound);
    assert_eq!(controller.session().tag, Some(tag("04A1B2")));
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 1);
    assert!(!reader.is_registered());
}

#[tokio::test(start_paused = true)]
async fn test_state_changes_are_reported_in_order() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    reader.present_tag("04A1B2");

    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        let done = matches!(event, ScanEvent::TagDiscovered(_));
        seen.push(event);
        if done {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            ScanEvent::StateChanged(ScanStatus::CheckingAvailability),
            ScanEvent::StateChanged(ScanStatus::Scanning),
            ScanEvent::StateChanged(ScanStatus::TagFound),
            ScanEvent::TagDiscovered(tag("04A1B2")),
        ]
    );

    controller.reset().await.unwrap();
    assert_eq!(drain(&mut events), vec![ScanEvent::StateChanged(ScanStatus::Idle)]);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_reader_never_starts() {
    let reader = SimulatedReader::unsupported();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    let status = controller.start().await.unwrap();

    assert_eq!(status, ScanStatus::Failed(ScanErrorKind::NotSupported));
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::Error(ScanErrorKind::NotSupported)
    );
    assert_eq!(reader.calls(ReaderOp::Start), 0);
    assert_eq!(reader.calls(ReaderOp::RegisterForTag), 0);
    assert_eq!(
        controller.session().last_error,
        Some(ScanErrorKind::NotSupported)
    );
}

#[tokio::test(start_paused = true)]
async fn test_support_query_failure_reports_not_supported() {
    let reader = SimulatedReader::new();
    reader.fail_on(ReaderOp::IsSupported);
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::NotSupported)
    );
    assert_eq!(reader.calls(ReaderOp::Start), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_tag() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    let started = Instant::now();
    controller.start().await.unwrap();

    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::Error(ScanErrorKind::Timeout)
    );
    assert!(started.elapsed() >= Duration::from_secs(20));
    assert_eq!(controller.status(), ScanStatus::TimedOut);
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 1);
    assert!(!reader.is_registered());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_configurable() {
    let reader = SimulatedReader::new();
    let config = ScanConfig::builder().timeout_ms(5_000u64).build().unwrap();
    let (controller, mut events) = spawn_controller(&reader, config);

    let started = Instant::now();
    controller.start().await.unwrap();
    let session = controller.session();
    assert_eq!(
        session.timeout_at.unwrap() - session.started_at.unwrap(),
        Duration::from_secs(5)
    );

    next_outcome(&mut events).await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_tag_after_timeout_is_ignored() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    let sink = reader.current_sink().unwrap();
    next_outcome(&mut events).await;

    assert!(sink.deliver(Tag::new("04A1B2")));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(controller.status(), ScanStatus::TimedOut);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_never_double_registers() {
    let reader = SimulatedReader::new();
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    for _ in 0..3 {
        assert_eq!(controller.start().await.unwrap(), ScanStatus::Scanning);
    }

    assert_eq!(reader.overlapping_registrations(), 0);
    assert_eq!(reader.calls(ReaderOp::RegisterForTag), 3);
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 2);
    assert!(reader.is_registered());
    assert_eq!(controller.session().generation, 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_tag_after_restart_is_discarded() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    let stale = reader.current_sink().unwrap();
    controller.start().await.unwrap();
    assert_ne!(stale.generation(), controller.session().generation);

    stale.deliver(Tag::new("STALE01"));
    reader.present_tag("FRESH01");

    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::TagDiscovered(tag("FRESH01"))
    );
    assert_eq!(controller.session().tag, Some(tag("FRESH01")));
}

#[tokio::test(start_paused = true)]
async fn test_stale_tag_after_reset_is_discarded() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    let stale = reader.current_sink().unwrap();
    controller.reset().await.unwrap();
    drain(&mut events);

    stale.deliver(Tag::new("04A1B2"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(controller.status(), ScanStatus::Idle);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_idempotent() {
    let reader = SimulatedReader::new();
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();

    controller.reset().await.unwrap();
    assert_eq!(controller.status(), ScanStatus::Idle);
    controller.reset().await.unwrap();
    assert_eq!(controller.status(), ScanStatus::Idle);

    assert_eq!(reader.calls(ReaderOp::RegisterForTag), 1);
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 2);
    assert_eq!(reader.calls(ReaderOp::CancelPendingRequest), 2);
    assert_eq!(reader.overlapping_registrations(), 0);
    assert!(!reader.is_registered());
}

#[tokio::test(start_paused = true)]
async fn test_reset_recovers_from_stuck_listener() {
    let reader = SimulatedReader::new();
    reader.set_sticky_listener(true);
    reader.fail_on(ReaderOp::UnregisterForTag);
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::Error(ScanErrorKind::Timeout)
    );
    // The driver refused to unregister and still holds the listener.
    assert!(reader.is_registered());
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 1);

    reader.clear_failures();
    controller.reset().await.unwrap();
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 2);
    assert!(!reader.is_registered());

    assert_eq!(controller.start().await.unwrap(), ScanStatus::Scanning);
    assert_eq!(reader.overlapping_registrations(), 0);
    reader.present_tag("04A1B2");
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::TagDiscovered(tag("04A1B2"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_retries_unregister_until_it_succeeds() {
    let reader = SimulatedReader::new();
    reader.set_sticky_listener(true);
    reader.fail_on(ReaderOp::UnregisterForTag);
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    controller.reset().await.unwrap();
    assert!(reader.is_registered());
    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::InitError)
    );

    reader.clear_failures();
    controller.reset().await.unwrap();
    assert!(!reader.is_registered());
    assert_eq!(controller.start().await.unwrap(), ScanStatus::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_reset_waits_for_settle_delay() {
    let reader = SimulatedReader::new();
    let config = ScanConfig::builder()
        .settle_delay_ms(1_500u64)
        .build()
        .unwrap();
    let (controller, _events) = spawn_controller(&reader, config);

    let before = Instant::now();
    controller.reset().await.unwrap();
    assert!(before.elapsed() >= Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_pending_timeout() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    controller.reset().await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(controller.status(), ScanStatus::Idle);
    assert!(
        !drain(&mut events)
            .iter()
            .any(|event| matches!(event, ScanEvent::Error(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_then_recovery() {
    let reader = SimulatedReader::new();
    reader.fail_on(ReaderOp::Start);
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::InitError)
    );
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::Error(ScanErrorKind::InitError)
    );
    assert_eq!(reader.calls(ReaderOp::RegisterForTag), 0);

    reader.clear_failures();
    controller.reset().await.unwrap();
    assert_eq!(controller.start().await.unwrap(), ScanStatus::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_register_failure_halts_session() {
    let reader = SimulatedReader::new();
    reader.fail_on(ReaderOp::RegisterForTag);
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::InitError)
    );
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::Error(ScanErrorKind::InitError)
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        controller.status(),
        ScanStatus::Failed(ScanErrorKind::InitError)
    );
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_radio_is_reported() {
    let reader = SimulatedReader::new();
    reader.set_enabled(false);
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::NotEnabled)
    );
    assert_eq!(reader.calls(ReaderOp::Start), 0);
}

#[tokio::test(start_paused = true)]
async fn test_enabled_check_can_be_skipped() {
    let reader = SimulatedReader::new();
    reader.set_enabled(false);
    let config = ScanConfig::builder().require_enabled(false).build().unwrap();
    let (controller, _events) = spawn_controller(&reader, config);

    // Without the query the driver's own start() failure is what surfaces.
    assert_eq!(
        controller.start().await.unwrap(),
        ScanStatus::Failed(ScanErrorKind::InitError)
    );
    assert_eq!(reader.calls(ReaderOp::IsEnabled), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_failures_are_swallowed() {
    let reader = SimulatedReader::new();
    reader.fail_on(ReaderOp::UnregisterForTag);
    reader.fail_on(ReaderOp::CancelPendingRequest);
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    reader.present_tag("04A1B2");
    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::TagDiscovered(tag("04A1B2"))
    );

    controller.reset().await.unwrap();
    assert_eq!(controller.status(), ScanStatus::Idle);
    assert!(
        !drain(&mut events)
            .iter()
            .any(|event| matches!(event, ScanEvent::Error(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_blank_tag_id_keeps_scanning() {
    let reader = SimulatedReader::new();
    let (controller, mut events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    reader.present_tag("   ");
    reader.present_tag("04A1B2");

    assert_eq!(
        next_outcome(&mut events).await,
        ScanEvent::TagDiscovered(tag("04A1B2"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_reader_calls_are_serialized() {
    let reader = SimulatedReader::new().with_latency(Duration::from_millis(100));
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    let (first, reset, second) =
        tokio::join!(controller.start(), controller.reset(), controller.start());

    assert_eq!(first.unwrap(), ScanStatus::Scanning);
    reset.unwrap();
    assert_eq!(second.unwrap(), ScanStatus::Scanning);
    assert_eq!(reader.peak_in_flight(), 1);
    assert_eq!(reader.overlapping_registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_sees_scanning() {
    let reader = SimulatedReader::new();
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());
    let mut session = controller.subscribe();

    controller.start().await.unwrap();
    let snapshot = session
        .wait_for(|s| s.status == ScanStatus::Scanning)
        .await
        .unwrap()
        .clone();

    assert!(snapshot.started_at.is_some());
    assert_eq!(snapshot.generation, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_registration() {
    let reader = SimulatedReader::new();
    let (controller, _events) = spawn_controller(&reader, ScanConfig::default());

    controller.start().await.unwrap();
    controller.shutdown().await.unwrap();

    assert!(!reader.is_registered());
    assert_eq!(reader.calls(ReaderOp::UnregisterForTag), 1);
}
