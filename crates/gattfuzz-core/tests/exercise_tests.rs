//! Exerciser behaviour against a scripted peripheral


use std::sync::Arc;
use std::time::Duration;

use gattfuzz_core::exercise::{notify_subscribe, read_fuzz, write_fuzz};
use gattfuzz_core::{
    payload_rng, Capabilities, Characteristic, ConnectionManager, ExerciseKind, ExerciseOutcome,
    FuzzConfig, FuzzEvent, MemorySink, NotificationRecord, WriteMode,
};
use test_utils::*;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

struct Harness {
    manager: ConnectionManager<MockTransport>,
    transport: Arc<MockTransport>,
    sink: Arc<MemorySink>,
    clock: Arc<MockClock>,
    config: FuzzConfig,
}

async fn connected_harness(transport: MockTransport) -> Harness {
    connected_harness_with_clock(transport, MockClock::new()).await
}

async fn connected_harness_with_clock(transport: MockTransport, clock: Arc<MockClock>) -> Harness {
    let config = create_test_config();
    let transport = Arc::new(transport);
    let sink = Arc::new(MemorySink::new());
    let mut manager = ConnectionManager::new(transport.clone(), &config, sink.clone(), clock.clone());
    manager.connect().await.unwrap();
    Harness {
        manager,
        transport,
        sink,
        clock,
        config,
    }
}

fn single(characteristic: &Characteristic) -> MockTransport {
    MockTransport::new(vec![create_test_service(vec![characteristic.clone()])])
}

// ----------------------------------------------------------------------------
// Write Fuzz
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_write_failures_do_not_shorten_the_loop() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let mut h = connected_harness(single(&target).failing_writes()).await;
    let mut rng = payload_rng(Some(1));

    let outcome = write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    assert_eq!(outcome, ExerciseOutcome::Completed { iterations: 5 });
    assert_eq!(h.transport.write_calls(), 5);
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::WriteFailed { .. })),
        5
    );
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::WriteOk { .. })),
        0
    );
}

#[tokio::test]
async fn test_write_fuzz_paces_every_iteration() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let mut h = connected_harness(single(&target)).await;
    let mut rng = payload_rng(Some(2));

    write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    assert_eq!(h.clock.count(h.config.write_delay()), h.config.write_times as usize);
}

#[tokio::test]
async fn test_write_failure_records_payload_length() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let mut h = connected_harness(single(&target).failing_writes()).await;
    let mut rng = payload_rng(Some(3));

    write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    let written = h.transport.written();
    let failed_lengths: Vec<usize> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            FuzzEvent::WriteFailed { uuid, len, .. } if uuid == target.uuid => Some(len),
            _ => None,
        })
        .collect();
    assert_eq!(
        failed_lengths,
        written.iter().map(Vec::len).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_write_mode_follows_capabilities() {
    let acked = create_test_characteristic(0xfff1, Capabilities::WRITE | Capabilities::WRITE_WITHOUT_RESPONSE);
    let unacked = create_test_characteristic(0xfff2, Capabilities::WRITE_WITHOUT_RESPONSE);
    let transport = MockTransport::new(vec![create_test_service(vec![acked.clone(), unacked.clone()])]);
    let mut h = connected_harness(transport).await;
    let mut rng = payload_rng(Some(4));

    write_fuzz(&mut h.manager, &acked, &h.config, &mut rng).await;
    write_fuzz(&mut h.manager, &unacked, &h.config, &mut rng).await;

    assert_eq!(
        h.transport
            .count_ops(|op| *op == MockOp::Write(acked.uuid, WriteMode::WithResponse)),
        5
    );
    assert_eq!(
        h.transport
            .count_ops(|op| *op == MockOp::Write(unacked.uuid, WriteMode::WithoutResponse)),
        5
    );
}

#[tokio::test]
async fn test_write_fuzz_survives_mid_run_disconnect() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let mut h = connected_harness(single(&target).dropping_link_after_writes(2)).await;
    let mut rng = payload_rng(Some(5));

    let outcome = write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    assert_eq!(outcome, ExerciseOutcome::Completed { iterations: 5 });
    assert_eq!(h.transport.write_calls(), 5);
    assert_eq!(h.transport.connect_calls(), 2);
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::Reconnecting { .. })),
        1
    );
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::WriteOk { .. })),
        5
    );
}

#[tokio::test]
async fn test_failed_reconnect_abandons_remaining_writes() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let mut h = connected_harness(
        single(&target)
            .dropping_link_after_writes(2)
            .failing_reconnects(),
    )
    .await;
    let mut rng = payload_rng(Some(6));

    let outcome = write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    assert!(matches!(outcome, ExerciseOutcome::Aborted { completed: 2, .. }));
    assert_eq!(h.transport.write_calls(), 2);
    assert_eq!(
        count_events(&h.sink, |e| matches!(
            e,
            FuzzEvent::ExerciseAborted { kind: ExerciseKind::Write, .. }
        )),
        1
    );
}

#[tokio::test]
async fn test_vanished_characteristic_aborts_exerciser() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);
    let other = create_test_characteristic(0xfff2, Capabilities::READ);
    let transport = MockTransport::new(vec![create_test_service(vec![target.clone(), other.clone()])])
        .dropping_link_after_writes(1)
        .with_services_after_reconnect(vec![create_test_service(vec![other])]);
    let mut h = connected_harness(transport).await;
    let mut rng = payload_rng(Some(7));

    let outcome = write_fuzz(&mut h.manager, &target, &h.config, &mut rng).await;

    match outcome {
        ExerciseOutcome::Aborted { completed, reason } => {
            assert_eq!(completed, 1);
            assert!(reason.contains("disappeared"));
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(h.transport.write_calls(), 1);
}

#[tokio::test]
async fn test_seeded_write_sequence_is_reproducible() {
    let target = create_test_characteristic(0xfff1, Capabilities::WRITE);

    let mut first = connected_harness(single(&target)).await;
    let mut rng = payload_rng(Some(1234));
    write_fuzz(&mut first.manager, &target, &first.config, &mut rng).await;

    let mut second = connected_harness(single(&target)).await;
    let mut rng = payload_rng(Some(1234));
    write_fuzz(&mut second.manager, &target, &second.config, &mut rng).await;

    assert_eq!(first.transport.written(), second.transport.written());
}

// ----------------------------------------------------------------------------
// Read Fuzz
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_read_fuzz_paces_and_records() {
    let target = create_test_characteristic(0x2a19, Capabilities::READ);
    let mut h = connected_harness(single(&target)).await;

    let outcome = read_fuzz(&mut h.manager, &target, &h.config).await;

    assert_eq!(outcome, ExerciseOutcome::Completed { iterations: 3 });
    assert_eq!(h.transport.read_calls(), 3);
    assert_eq!(h.clock.count(h.config.write_delay()), 3);
    assert_eq!(
        count_events(&h.sink, |e| matches!(
            e,
            FuzzEvent::ReadOk { len: 3, preview, .. } if preview == "010203"
        )),
        3
    );
}

#[tokio::test]
async fn test_read_failures_do_not_shorten_the_loop() {
    let target = create_test_characteristic(0x2a19, Capabilities::READ);
    let mut h = connected_harness(single(&target).failing_reads()).await;

    let outcome = read_fuzz(&mut h.manager, &target, &h.config).await;

    assert!(outcome.is_completed());
    assert_eq!(h.transport.read_calls(), 3);
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::ReadFailed { .. })),
        3
    );
}

// ----------------------------------------------------------------------------
// Notify Subscribe
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_notifications_last_write_wins() {
    let target = create_test_characteristic(0x2a37, Capabilities::NOTIFY);
    let transport = single(&target).with_notifications(vec![
        b"A".to_vec(),
        b"B".to_vec(),
        b"C".to_vec(),
    ]);
    let mut h = connected_harness(transport).await;
    let mut record = NotificationRecord::new();

    let outcome = notify_subscribe(&mut h.manager, &target, &h.config, &mut record).await;

    assert_eq!(outcome, ExerciseOutcome::Completed { iterations: 3 });
    assert_eq!(record.latest(&target.uuid), Some(&b"C"[..]));

    let received: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            FuzzEvent::NotificationReceived { preview, .. } => Some(preview),
            _ => None,
        })
        .collect();
    assert_eq!(received, vec!["41", "42", "43"]);

    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(10)]);
    assert_eq!(
        h.transport.ops()[1..],
        [MockOp::Subscribe(target.uuid), MockOp::Unsubscribe(target.uuid)]
    );
}

#[tokio::test]
async fn test_notifications_delivered_from_another_task_during_window() {
    let target = create_test_characteristic(0x2a37, Capabilities::NOTIFY);
    let mut h = connected_harness_with_clock(single(&target), MockClock::gated()).await;
    let mut record = NotificationRecord::new();

    let peripheral = h.transport.clone();
    let clock = h.clock.clone();
    let producer = tokio::spawn(async move {
        peripheral.subscribed().await;
        for value in [b"A", b"B", b"C"] {
            peripheral.notify(value).await;
            tokio::task::yield_now().await;
        }
        clock.release();
    });

    let outcome = notify_subscribe(&mut h.manager, &target, &h.config, &mut record).await;
    producer.await.unwrap();

    assert_eq!(outcome, ExerciseOutcome::Completed { iterations: 3 });
    assert_eq!(record.latest(&target.uuid), Some(&b"C"[..]));

    let received: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            FuzzEvent::NotificationReceived { preview, .. } => Some(preview),
            _ => None,
        })
        .collect();
    assert_eq!(received, vec!["41", "42", "43"]);
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(10)]);
}

#[tokio::test]
async fn test_subscribe_failure_returns_without_retry() {
    let target = create_test_characteristic(0x2a37, Capabilities::NOTIFY);
    let mut h = connected_harness(single(&target).failing_subscribe()).await;
    let mut record = NotificationRecord::new();

    let outcome = notify_subscribe(&mut h.manager, &target, &h.config, &mut record).await;

    assert!(matches!(outcome, ExerciseOutcome::Aborted { completed: 0, .. }));
    assert!(record.is_empty());
    assert!(h.clock.sleeps().is_empty());
    assert_eq!(
        h.transport
            .count_ops(|op| matches!(op, MockOp::Unsubscribe(_))),
        0
    );
    assert_eq!(
        count_events(&h.sink, |e| matches!(e, FuzzEvent::SubscribeFailed { .. })),
        1
    );
}
