//! End-to-end tests driving the engine through its public surface only,
//! against an in-memory store.

use std::time::Duration;

use courier_db::Database;
use courier_engine::rate_guard::RateGuardConfig;
use courier_engine::{Engine, EngineConfig, Error};
use courier_types::models::ListingView;

fn engine() -> Engine {
    Engine::new(Database::open_in_memory().unwrap())
}

#[test]
fn conversation_lifecycle() {
    let engine = engine();
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();

    // Alice opens a thread, Bob replies, Alice replies to the reply.
    let root = engine
        .create_message(alice.id, bob.id, "lunch?", None, "198.51.100.7")
        .unwrap();
    let reply = engine
        .create_message(bob.id, alice.id, "sure, noon?", Some(root.id), "198.51.100.8")
        .unwrap();
    let confirm = engine
        .create_message(alice.id, bob.id, "noon works", Some(reply.id), "198.51.100.7")
        .unwrap();

    // Each creation produced exactly one notification for its receiver.
    assert_eq!(engine.notifications_for(bob.id).unwrap().len(), 2);
    assert_eq!(engine.notifications_for(alice.id).unwrap().len(), 1);

    // The whole thread hangs off the root in timestamp order.
    let thread = engine.resolve_thread(root.id).unwrap();
    assert_eq!(
        thread.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![reply.id, confirm.id]
    );

    // Bob has two unread messages, newest first, minimal projection.
    let unread = engine.unread_for(bob.id).unwrap();
    assert_eq!(unread.len(), 2);
    assert_eq!(unread[0].id, confirm.id);
    assert_eq!(unread[1].id, root.id);

    engine.mark_read(root.id).unwrap();
    let unread = engine.unread_for(bob.id).unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, confirm.id);

    // A notification can be acknowledged without touching the message.
    let first_notification = engine.notifications_for(bob.id).unwrap().pop().unwrap();
    engine.mark_notification_read(first_notification.id).unwrap();
    let acknowledged = engine
        .notifications_for(bob.id)
        .unwrap()
        .into_iter()
        .find(|n| n.id == first_notification.id)
        .unwrap();
    assert!(acknowledged.is_read);

    engine.shutdown();
}

#[test]
fn edits_are_captured_and_no_op_saves_are_not() {
    let engine = engine();
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();

    let message = engine
        .create_message(alice.id, bob.id, "meet at 5", None, "198.51.100.7")
        .unwrap();

    // Saving identical content records nothing.
    let same = engine
        .update_message_content(message.id, "meet at 5", alice.id)
        .unwrap();
    assert!(!same.edited);
    assert!(engine.history_for(message.id).unwrap().is_empty());

    // A real change snapshots the old content and flags the message.
    let changed = engine
        .update_message_content(message.id, "meet at 6", alice.id)
        .unwrap();
    assert!(changed.edited);
    let history = engine.history_for(message.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_content, "meet at 5");
    assert_eq!(history[0].editor_id, alice.id);

    // Editing a missing message surfaces as NotFound, not a panic.
    assert!(matches!(
        engine.update_message_content(uuid::Uuid::new_v4(), "x", alice.id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn user_deletion_is_total() {
    let engine = engine();
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();
    let carol = engine.create_user("carol").unwrap();

    let to_bob = engine
        .create_message(alice.id, bob.id, "hi bob", None, "198.51.100.7")
        .unwrap();
    engine
        .create_message(bob.id, alice.id, "hi alice", None, "198.51.100.8")
        .unwrap();
    engine
        .create_message(carol.id, bob.id, "hi from carol", None, "198.51.100.9")
        .unwrap();
    engine
        .update_message_content(to_bob.id, "hi bob!", alice.id)
        .unwrap();

    engine.delete_user(alice.id).unwrap();

    // No messages reference alice in either direction.
    assert!(engine.get_listing(ListingView::Inbox, alice.id).unwrap().messages.is_empty());
    assert!(engine.get_listing(ListingView::Outbox, alice.id).unwrap().messages.is_empty());
    assert!(engine.notifications_for(alice.id).unwrap().is_empty());
    assert!(matches!(engine.get_message(to_bob.id), Err(Error::NotFound(_))));
    assert!(engine.history_for(to_bob.id).is_err());

    // Exactly one deletion-log row, and it survives the user.
    let log = engine.deletion_log_for("alice").unwrap();
    assert_eq!(log.len(), 1);

    // Carol's conversation with Bob is untouched.
    let bobs_inbox = engine.get_listing(ListingView::Inbox, bob.id).unwrap();
    assert_eq!(bobs_inbox.messages.len(), 1);
    assert_eq!(bobs_inbox.messages[0].sender_id, carol.id);

    // Deleting again: the user is already gone.
    assert!(matches!(engine.delete_user(alice.id), Err(Error::NotFound(_))));
}

#[test]
fn default_rate_guard_bounds_creation_to_five_per_window() {
    let engine = engine();
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();

    for i in 0..5 {
        engine
            .create_message(alice.id, bob.id, &format!("burst {i}"), None, "203.0.113.4")
            .unwrap();
    }
    let err = engine
        .create_message(alice.id, bob.id, "burst 5", None, "203.0.113.4")
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited));
    assert_eq!(err.code(), "RATE_LIMITED");

    // Only the five accepted creations left side effects behind.
    assert_eq!(engine.notifications_for(bob.id).unwrap().len(), 5);
}

#[test]
fn listing_cache_tolerates_bounded_staleness() {
    let db = Database::open_in_memory().unwrap();
    let config = EngineConfig {
        cache_ttl: Duration::from_millis(150),
        rate_guard: RateGuardConfig::default(),
    };
    let engine = Engine::with_config(db, config);
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();

    let message = engine
        .create_message(alice.id, bob.id, "unread for now", None, "198.51.100.7")
        .unwrap();

    let first = engine.get_listing(ListingView::Unread, bob.id).unwrap();
    assert_eq!(first.messages.len(), 1);

    // Marking read fires no invalidation; within the TTL the cached payload
    // is served as-is.
    engine.mark_read(message.id).unwrap();
    let stale = engine.get_listing(ListingView::Unread, bob.id).unwrap();
    assert_eq!(stale, first);

    // Once the TTL lapses the recomputed listing reflects the store.
    std::thread::sleep(Duration::from_millis(200));
    let fresh = engine.get_listing(ListingView::Unread, bob.id).unwrap();
    assert!(fresh.messages.is_empty());
}

#[test]
fn new_message_is_visible_immediately_after_invalidation() {
    let engine = engine();
    let alice = engine.create_user("alice").unwrap();
    let bob = engine.create_user("bob").unwrap();

    engine
        .create_message(alice.id, bob.id, "first", None, "198.51.100.7")
        .unwrap();
    assert_eq!(
        engine.get_listing(ListingView::Inbox, bob.id).unwrap().messages.len(),
        1
    );

    // The cached inbox is dropped by the post-create reaction, so the next
    // read sees the new message without waiting out the TTL.
    engine
        .create_message(alice.id, bob.id, "second", None, "198.51.100.7")
        .unwrap();
    assert_eq!(
        engine.get_listing(ListingView::Inbox, bob.id).unwrap().messages.len(),
        2
    );
}
