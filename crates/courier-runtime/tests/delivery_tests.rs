//! Delivery cycle tests
//!
//! Send, push, acknowledge and replay against the in-memory collaborators, checking durable
//! state, tracker state and what each session actually received.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    AckEnvelope, CorrelationId, CourierError, DeliveryConfig, DeliveryEvent, MessageStore,
    NewMessage, User, PUSH_TYPE,
};
use courier_runtime::{AckOutcome, Dispatch, DispatchOutcome};

mod test_utils;
use test_utils::{FixedIdGenerator, Harness};

// ----------------------------------------------------------------------------
// Send Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_send_to_unknown_recipient_stores_nothing() {
    let h = Harness::new();

    let outcome = h
        .service
        .send_message(NewMessage::new("nobody", "Hi", "hello"))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::RecipientUnknown);
    assert!(!outcome.is_accepted());
    assert_eq!(h.store.message_count().await, 0);
    assert!(h.service.tracker().is_empty());
    assert_eq!(h.observer.count("recipient_unknown"), 1);
}

#[tokio::test]
async fn test_send_to_offline_recipient_is_stored_unconfirmed() {
    let h = Harness::new();
    h.users.register("alice");

    let outcome = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();

    let message_id = match outcome {
        DispatchOutcome::Stored { message_id } => message_id,
        other => panic!("expected Stored, got {:?}", other),
    };

    let stored = h.store.get_message(message_id).await.unwrap().unwrap();
    assert!(!stored.confirmed);
    assert_eq!(stored.title, "Hi");
    assert!(h.service.tracker().is_empty());
    assert_eq!(h.observer.count("pushed"), 0);
}

#[tokio::test]
async fn test_send_to_online_recipient_pushes_once() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let mut inbox = h.sessions.connect(&alice);

    let outcome = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();

    let message_id = outcome.message_id().unwrap();
    let correlation_id = outcome.correlation_id().unwrap().clone();

    assert_eq!(h.service.tracker().len(), 1);
    assert_eq!(h.service.tracker().resolve(&correlation_id), Some(message_id));

    let push = inbox.try_recv().unwrap();
    assert_eq!(push.id, correlation_id);
    assert_eq!(push.kind, PUSH_TYPE);
    assert_eq!(push.title, "Hi");
    assert_eq!(push.content, "hello");
    assert!(inbox.try_recv().is_err());

    let entry = h.service.tracker().get(&correlation_id).unwrap();
    assert_eq!(entry.recipient, alice.username);
}

#[tokio::test]
async fn test_invalid_message_rejected_before_lookup() {
    let h = Harness::new();
    h.users.register("alice");

    let title = "x".repeat(DeliveryConfig::testing().max_title_length + 1);
    let err = h
        .service
        .send_message(NewMessage::new("alice", title, "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, CourierError::InvalidMessage { .. }));
    assert_eq!(h.store.message_count().await, 0);
    assert!(h.observer.events().is_empty());
}

#[tokio::test]
async fn test_storage_failure_on_send_propagates() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let mut inbox = h.sessions.connect(&alice);
    h.store.set_fail_writes(true);

    let err = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap_err();

    assert!(err.is_storage());
    assert!(h.service.tracker().is_empty());
    assert!(inbox.try_recv().is_err());
}

#[tokio::test]
async fn test_correlation_collision_keeps_message_stored() {
    let h = Harness::with_ids(Arc::new(FixedIdGenerator("same")));
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    h.service
        .send_message(NewMessage::new("alice", "first", "1"))
        .await
        .unwrap();
    let err = h
        .service
        .send_message(NewMessage::new("alice", "second", "2"))
        .await
        .unwrap_err();

    assert!(matches!(err, CourierError::DuplicateCorrelation { .. }));
    assert_eq!(h.store.message_count().await, 2);
    assert_eq!(h.service.tracker().len(), 1);

    let pending = h.store.offline_messages(&alice).await.unwrap();
    assert_eq!(pending.len(), 2);
}

#[tokio::test]
async fn test_dispatch_stored_message_does_not_duplicate_row() {
    let h = Harness::new();
    let alice = h.users.register("alice");

    let message_id = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap()
        .message_id()
        .unwrap();

    let mut inbox = h.sessions.connect(&alice);
    let stored = h.store.get_message(message_id).await.unwrap().unwrap();
    let outcome = h.service.dispatch(Dispatch::Stored(stored)).await.unwrap();

    assert_eq!(outcome.message_id(), Some(message_id));
    assert!(outcome.correlation_id().is_some());
    assert_eq!(h.store.message_count().await, 1);
    assert_eq!(inbox.try_recv().unwrap().title, "Hi");
}

// ----------------------------------------------------------------------------
// Acknowledgment Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_ack_confirms_once_and_retires_entry() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    let outcome = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let message_id = outcome.message_id().unwrap();
    let correlation_id = outcome.correlation_id().unwrap().clone();

    let first = h.service.confirm(&correlation_id).await.unwrap();
    assert_eq!(first, AckOutcome::Confirmed { message_id });
    assert!(first.confirmed_now());

    let stored = h.store.get_message(message_id).await.unwrap().unwrap();
    assert!(stored.confirmed);
    assert_eq!(h.service.tracker().resolve(&correlation_id), None);

    let second = h.service.confirm(&correlation_id).await.unwrap();
    assert_eq!(second, AckOutcome::Unknown);
    assert_eq!(h.observer.count("confirmed"), 1);
    assert_eq!(h.service.tracker_stats().retired, 1);
}

#[tokio::test]
async fn test_ack_for_unregistered_id_is_harmless() {
    let h = Harness::new();
    h.users.register("alice");
    h.service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let before = h.store.all_messages().await;

    let outcome = h
        .service
        .confirm(&CorrelationId::from("never-issued"))
        .await
        .unwrap();

    assert_eq!(outcome, AckOutcome::Unknown);
    assert_eq!(h.store.all_messages().await, before);
    assert_eq!(h.observer.count("unknown_ack"), 1);
}

#[tokio::test]
async fn test_handle_ack_envelope_from_push() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let mut inbox = h.sessions.connect(&alice);

    h.service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let push = inbox.try_recv().unwrap();

    let outcome = h.service.handle_ack(&AckEnvelope::for_push(&push)).await.unwrap();

    assert!(outcome.confirmed_now());
    assert_eq!(h.store.confirmed_count().await, 1);
}

#[tokio::test]
async fn test_storage_failure_on_ack_keeps_entry_for_retry() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    let correlation_id = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap()
        .correlation_id()
        .unwrap()
        .clone();

    h.store.set_fail_writes(true);
    let err = h.service.confirm(&correlation_id).await.unwrap_err();
    assert!(err.is_storage());
    assert!(h.service.tracker().contains(&correlation_id));
    assert_eq!(h.store.confirmed_count().await, 0);

    h.store.set_fail_writes(false);
    let outcome = h.service.confirm(&correlation_id).await.unwrap();
    assert!(outcome.confirmed_now());
    assert!(!h.service.tracker().contains(&correlation_id));
}

#[tokio::test]
async fn test_stale_entry_for_confirmed_message_skips_write() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    let first = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let message_id = first.message_id().unwrap();

    // Reconnect before the first ack lands: the message goes out again under a new id
    let replay = h.service.on_recipient_connected(&alice).await.unwrap();
    assert_eq!(replay.replayed(), 1);
    let second_id = replay.correlation_ids[0].clone();
    assert_ne!(&second_id, first.correlation_id().unwrap());

    let outcome = h
        .service
        .confirm(first.correlation_id().unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, AckOutcome::Confirmed { message_id });

    h.store.set_fail_writes(true);
    let outcome = h.service.confirm(&second_id).await.unwrap();
    assert_eq!(outcome, AckOutcome::AlreadyConfirmed { message_id });
    assert!(h.service.tracker().is_empty());
    assert_eq!(h.observer.count("duplicate_ack"), 1);
}

#[tokio::test]
async fn test_ack_for_missing_row_is_an_error() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    let correlation_id = CorrelationId::from("orphan");
    h.service
        .tracker()
        .register(
            correlation_id.clone(),
            courier_runtime::CorrelationEntry::new(
                courier_core::MessageId::new(404),
                alice.username.clone(),
                courier_core::Timestamp::new(0),
            ),
        )
        .unwrap();

    let err = h.service.confirm(&correlation_id).await.unwrap_err();
    assert!(matches!(err, CourierError::MessageNotFound { .. }));
    assert!(h.service.tracker().contains(&correlation_id));
}

// ----------------------------------------------------------------------------
// Replay Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_replay_pushes_unconfirmed_oldest_first() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    h.users.register("bob");

    for title in ["one", "two", "three"] {
        h.service
            .send_message(NewMessage::new("alice", title, "body"))
            .await
            .unwrap();
        h.service
            .send_message(NewMessage::new("bob", title, "body"))
            .await
            .unwrap();
        h.clock.advance(Duration::from_secs(1));
    }

    let mut inbox = h.sessions.connect(&alice);
    let summary = h.service.on_recipient_connected(&alice).await.unwrap();

    assert_eq!(summary.recipient, alice.username);
    assert_eq!(summary.replayed(), 3);

    let titles: Vec<String> = (0..3).map(|_| inbox.try_recv().unwrap().title).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    assert!(inbox.try_recv().is_err());

    assert_eq!(h.service.tracker().len(), 3);
    assert!(h.observer.events().contains(&DeliveryEvent::Replayed {
        recipient: alice.username.clone(),
        count: 3,
    }));
}

#[tokio::test]
async fn test_replay_skips_confirmed_and_uses_fresh_ids() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let mut inbox = h.sessions.connect(&alice);

    let acked = h
        .service
        .send_message(NewMessage::new("alice", "acked", "1"))
        .await
        .unwrap();
    let unacked = h
        .service
        .send_message(NewMessage::new("alice", "unacked", "2"))
        .await
        .unwrap();
    h.service
        .confirm(acked.correlation_id().unwrap())
        .await
        .unwrap();
    while inbox.try_recv().is_ok() {}

    // Reconnect: the old session is replaced
    let mut inbox = h.sessions.connect(&alice);
    let summary = h.service.on_recipient_connected(&alice).await.unwrap();

    assert_eq!(summary.replayed(), 1);
    let push = inbox.try_recv().unwrap();
    assert_eq!(push.title, "unacked");
    assert_ne!(&push.id, unacked.correlation_id().unwrap());
    assert_ne!(&push.id, acked.correlation_id().unwrap());
}

#[tokio::test]
async fn test_replay_without_session_pushes_nothing() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    h.service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();

    let summary = h.service.on_recipient_connected(&alice).await.unwrap();

    assert_eq!(summary.replayed(), 0);
    assert!(h.service.tracker().is_empty());
    assert_eq!(h.observer.count("replayed"), 0);
}

#[tokio::test]
async fn test_replay_batch_limit() {
    let config = DeliveryConfig {
        replay_batch_limit: Some(2),
        ..DeliveryConfig::testing()
    };
    let h = Harness::with_config(config);
    let alice = h.users.register("alice");

    for title in ["a", "b", "c"] {
        h.service
            .send_message(NewMessage::new("alice", title, ""))
            .await
            .unwrap();
    }

    let mut inbox = h.sessions.connect(&alice);
    let summary = h.service.on_recipient_connected(&alice).await.unwrap();

    assert_eq!(summary.replayed(), 2);
    assert_eq!(inbox.try_recv().unwrap().title, "a");
    assert_eq!(inbox.try_recv().unwrap().title, "b");
    assert!(inbox.try_recv().is_err());
}

// ----------------------------------------------------------------------------
// Purge Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_purge_stale_correlations_then_replay() {
    let h = Harness::new();
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    let outcome = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let correlation_id = outcome.correlation_id().unwrap().clone();

    h.clock.advance(Duration::from_secs(30));
    assert_eq!(h.service.purge_stale_correlations(), 0);

    h.clock.advance(Duration::from_secs(31));
    assert_eq!(h.service.purge_stale_correlations(), 1);
    assert_eq!(h.service.tracker_stats().purged, 1);

    // A late ack for the purged id changes nothing
    let late = h.service.confirm(&correlation_id).await.unwrap();
    assert_eq!(late, AckOutcome::Unknown);
    assert_eq!(h.store.confirmed_count().await, 0);

    // The message is still durable and goes out again
    let mut inbox = h.sessions.connect(&alice);
    let summary = h.service.on_recipient_connected(&alice).await.unwrap();
    assert_eq!(summary.replayed(), 1);
    assert_eq!(inbox.try_recv().unwrap().title, "Hi");
}

#[tokio::test]
async fn test_purge_disabled_by_default() {
    let h = Harness::with_config(DeliveryConfig::default());
    let alice = h.users.register("alice");
    let _inbox = h.sessions.connect(&alice);

    h.service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(86400 * 365));

    assert_eq!(h.service.purge_stale_correlations(), 0);
    assert_eq!(h.service.tracker().len(), 1);
}

// ----------------------------------------------------------------------------
// End to End
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_offline_send_reconnect_ack() {
    let h = Harness::new();
    let alice = h.users.register("alice");

    let sent = h
        .service
        .send_message(NewMessage::new("alice", "Hi", "hello"))
        .await
        .unwrap();
    let message_id = sent.message_id().unwrap();
    assert!(sent.correlation_id().is_none());

    let mut inbox = h.sessions.connect(&alice);
    let summary = h.service.on_recipient_connected(&alice).await.unwrap();
    let c1 = summary.correlation_ids[0].clone();

    let push = inbox.try_recv().unwrap();
    assert_eq!(push.id, c1);
    assert_eq!((push.title.as_str(), push.content.as_str()), ("Hi", "hello"));

    let outcome = h.service.confirm(&c1).await.unwrap();
    assert_eq!(outcome, AckOutcome::Confirmed { message_id });
    assert!(h.store.get_message(message_id).await.unwrap().unwrap().confirmed);
    assert_eq!(h.service.tracker().resolve(&c1), None);

    // Nothing left to replay
    let again = h.service.on_recipient_connected(&User::new("alice")).await.unwrap();
    assert_eq!(again.replayed(), 0);
}
