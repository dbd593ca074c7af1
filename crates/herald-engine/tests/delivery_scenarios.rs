// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end delivery scenarios over the engine harness.

use std::time::Duration;

use herald_core::{MarkReadOutcome, MessageDraft, MessageStatus, RouteOutcome};
use herald_engine::CatchUpOutcome;
use herald_engine::events;
use herald_test_utils::{EngineHarness, StoreOp};

fn recipients(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn send_to_offline_user_is_queued_and_pending() {
    let h = EngineHarness::new().await.unwrap();
    let report = h
        .service
        .send_batch(&recipients(&["u1"]), &MessageDraft::new("Title", "Body"))
        .await
        .unwrap();
    assert_eq!(
        (report.delivered.len(), report.queued.len(), report.failed.len()),
        (0, 1, 0)
    );

    let pending = h.service.get_pending("u1").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Title");
    assert_eq!(pending[0].body, "Body");
}

#[tokio::test]
async fn send_to_connected_user_is_delivered() {
    let h = EngineHarness::new().await.unwrap();
    let (handle, _) = h.connect_and_catch_up("u1").await.unwrap();

    let report = h
        .service
        .send_batch(&recipients(&["u1"]), &MessageDraft::new("Live", "now"))
        .await
        .unwrap();
    assert_eq!(
        (report.delivered.len(), report.queued.len(), report.failed.len()),
        (1, 0, 0)
    );
    assert_eq!(h.notification_titles(&handle).await, vec!["Live"]);
    assert!(h.service.get_pending("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn store_failure_for_one_recipient_is_isolated() {
    let h = EngineHarness::new().await.unwrap();
    h.store.fail(StoreOp::PushBack, Some("backlog:u2")).await;

    let report = h
        .service
        .send_batch(
            &recipients(&["u1", "u2", "u3"]),
            &MessageDraft::new("t", "b"),
        )
        .await
        .unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.queued.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].recipient_id, "u2");
    assert!(matches!(
        report.outcome_for("u2"),
        Some(RouteOutcome::Failed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn reconnect_replays_backlog_in_order_then_empties_it() {
    let h = EngineHarness::builder()
        .with_pacing_ms(100)
        .build()
        .await
        .unwrap();
    for title in ["first", "second", "third"] {
        h.send("u4", title).await.unwrap();
    }

    let (handle, report) = h.connect_and_catch_up("u4").await.unwrap();
    assert_eq!(report.outcome, CatchUpOutcome::Completed);
    assert_eq!(report.delivered, 3);
    assert_eq!(
        h.notification_titles(&handle).await,
        vec!["first", "second", "third"]
    );
    let sent = h.transport.sent_to(&handle).await;
    assert!(sent
        .iter()
        .filter(|e| e.event == events::NOTIFICATION)
        .all(|e| e.payload["catchUp"] == true));
    assert!(h.service.get_pending("u4").await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_read_on_undelivered_message_changes_nothing() {
    let h = EngineHarness::new().await.unwrap();
    let routed = h.send("u1", "queued").await.unwrap();

    let outcome = h.service.mark_read(&routed.message_id, "u1").await.unwrap();
    assert_eq!(
        outcome,
        MarkReadOutcome::NotDelivered {
            status: MessageStatus::Pending
        }
    );
    let record = h.service.get_message(&routed.message_id, "u1").await.unwrap();
    assert!(record.read_at.is_none());
    assert_eq!(record.status, MessageStatus::Pending);
}

#[tokio::test]
async fn fifo_holds_with_interleaved_recipients() {
    let h = EngineHarness::new().await.unwrap();
    for i in 0..5 {
        h.send("a", &format!("a{i}")).await.unwrap();
        h.send("b", &format!("b{i}")).await.unwrap();
    }
    let (ha, _) = h.connect_and_catch_up("a").await.unwrap();
    let (hb, _) = h.connect_and_catch_up("b").await.unwrap();
    assert_eq!(
        h.notification_titles(&ha).await,
        vec!["a0", "a1", "a2", "a3", "a4"]
    );
    assert_eq!(
        h.notification_titles(&hb).await,
        vec!["b0", "b1", "b2", "b3", "b4"]
    );
}

#[tokio::test]
async fn newest_presence_wins() {
    let h = EngineHarness::new().await.unwrap();
    let (first, _) = h.connect_and_catch_up("u1").await.unwrap();
    let (second, _) = h.connect_and_catch_up("u1").await.unwrap();
    assert_eq!(h.service.presence().lookup("u1").await, Some(second.clone()));

    h.send("u1", "to newest").await.unwrap();
    assert_eq!(h.notification_titles(&second).await, vec!["to newest"]);
    assert!(h.notification_titles(&first).await.is_empty());
}

#[tokio::test]
async fn unreachable_presence_falls_back_to_backlog() {
    let h = EngineHarness::new().await.unwrap();
    h.connect_and_catch_up("u1").await.unwrap();
    h.store.fail(StoreOp::Get, Some("presence:u1")).await;

    let routed = h.send("u1", "while blind").await.unwrap();
    assert_eq!(routed.outcome, RouteOutcome::Queued);
    assert_eq!(h.service.get_pending("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unregister_without_presence_is_harmless() {
    let h = EngineHarness::new().await.unwrap();
    h.service.presence().unregister("never-connected").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interrupted_catch_up_keeps_everything_for_next_time() {
    let h = EngineHarness::builder()
        .with_pacing_ms(100)
        .build()
        .await
        .unwrap();
    for i in 0..5 {
        h.send("u1", &format!("m{i}")).await.unwrap();
    }

    let (handle, pass) = h.connect("u1").await.unwrap();
    // Two sends at t=0 and t=100ms; drop the channel before the third.
    tokio::time::sleep(Duration::from_millis(150)).await;
    h.disconnect("u1", &handle).await.unwrap();
    let report = pass.await.unwrap();
    assert_eq!(report.outcome, CatchUpOutcome::Interrupted);
    assert_eq!(report.delivered, 2);
    assert_eq!(h.service.get_pending("u1").await.unwrap().len(), 5);

    // Next connection replays all five, duplicates included.
    let (again, report) = h.connect_and_catch_up("u1").await.unwrap();
    assert_eq!(report.outcome, CatchUpOutcome::Completed);
    assert_eq!(
        h.notification_titles(&again).await,
        vec!["m0", "m1", "m2", "m3", "m4"]
    );
}

#[tokio::test]
async fn read_requires_delivery_first() {
    let h = EngineHarness::new().await.unwrap();
    let (handle, _) = h.connect_and_catch_up("u1").await.unwrap();
    let routed = h.send("u1", "live").await.unwrap();
    assert_eq!(routed.outcome, RouteOutcome::Delivered);

    let before = h.service.get_message(&routed.message_id, "u1").await.unwrap();
    assert_eq!(before.status, MessageStatus::Delivered);
    let delivered_at = before.delivered_at.unwrap();
    assert!(delivered_at >= before.created_at);

    let outcome = h.service.mark_read(&routed.message_id, "u1").await.unwrap();
    let MarkReadOutcome::Marked { read_at } = outcome else {
        panic!("expected Marked, got {outcome:?}");
    };
    assert!(read_at >= delivered_at);

    let after = h.service.get_message(&routed.message_id, "u1").await.unwrap();
    assert_eq!(after.status, MessageStatus::Read);
    assert_eq!(after.delivered_at, Some(delivered_at));

    let receipts: Vec<_> = h
        .transport
        .sent_to(&handle)
        .await
        .into_iter()
        .filter(|e| e.event == events::READ_RECEIPT)
        .collect();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].payload["messageId"], routed.message_id.as_str());
}

#[tokio::test]
async fn sqlite_store_supports_full_cycle() {
    let h = EngineHarness::builder().with_sqlite().build().await.unwrap();
    h.send("u1", "one").await.unwrap();
    h.send("u1", "two").await.unwrap();
    let (handle, report) = h.connect_and_catch_up("u1").await.unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(h.notification_titles(&handle).await, vec!["one", "two"]);
    assert!(h.service.get_pending("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn total_outage_still_accounts_for_every_recipient() {
    let h = EngineHarness::new().await.unwrap();
    h.store.fail_all().await;
    let report = h
        .service
        .send_batch(&recipients(&["a", "b", "c"]), &MessageDraft::new("t", "b"))
        .await
        .unwrap();
    assert_eq!(report.failed.len(), 3);
    assert_eq!(report.accounted(), report.total);
    assert!(h.service.get_pending("a").await.is_err());
    assert_eq!(h.service.stats().failed, 3);
}

#[tokio::test]
async fn queued_despite_expiry_failure_can_be_read_after_replay() {
    let h = EngineHarness::new().await.unwrap();
    h.store.fail(StoreOp::Expire, Some("backlog:u1")).await;
    let routed = h.send("u1", "kept").await.unwrap();
    assert_eq!(routed.outcome, RouteOutcome::Queued);
    assert_eq!(h.service.stats().failed, 0);
    h.store.heal().await;

    let (handle, report) = h.connect_and_catch_up("u1").await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(h.notification_titles(&handle).await, vec!["kept"]);

    let record = h.service.get_message(&routed.message_id, "u1").await.unwrap();
    assert_eq!(record.status, MessageStatus::Delivered);
    let outcome = h.service.mark_read(&routed.message_id, "u1").await.unwrap();
    assert!(matches!(outcome, MarkReadOutcome::Marked { .. }));
}

#[tokio::test]
async fn oversized_expiry_and_padded_title_are_rejected() {
    let h = EngineHarness::new().await.unwrap();
    let far = MessageDraft::new("t", "b").with_expires_in(Duration::from_secs(10_000_000_000_000));
    let err = h.service.send_one("u1", &far).await.unwrap_err();
    assert!(matches!(err, herald_core::HeraldError::Validation(_)));

    let padded = format!("{}{}", "x".repeat(200), " ".repeat(50));
    let err = h
        .service
        .send_one("u1", &MessageDraft::new(padded, "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, herald_core::HeraldError::Validation(_)));
    assert!(h.service.get_pending("u1").await.unwrap().is_empty());
}
