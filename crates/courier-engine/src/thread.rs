//! Thread reconstruction: the transitive closure of replies under a root.

use std::collections::{HashSet, VecDeque};

use courier_db::queries;
use courier_types::Result;
use courier_types::models::Message;
use rusqlite::Connection;
use uuid::Uuid;

/// Collect every transitive reply of `root_id`, sorted by creation time
/// ascending. The root itself is not included.
///
/// One `replies_of` query per visited node: correctness first, not
/// query-count-optimal; callers that need a single round trip should reach
/// for a recursive CTE instead. The visited set guards against double
/// counting and guarantees termination even when parent pointers have been
/// corrupted into a cycle.
pub fn resolve_thread(conn: &Connection, root_id: Uuid) -> Result<Vec<Message>> {
    // The root must exist; having no replies is fine.
    let root = queries::get_message(conn, root_id)?;

    let mut visited: HashSet<Uuid> = HashSet::from([root.id]);
    let mut queue: VecDeque<Uuid> = VecDeque::from([root.id]);
    let mut thread: Vec<Message> = Vec::new();

    while let Some(current) = queue.pop_front() {
        for reply in queries::replies_of(conn, current)? {
            if visited.insert(reply.id) {
                queue.push_back(reply.id);
                thread.push(reply);
            }
        }
    }

    thread.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(thread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use courier_types::Error;
    use courier_types::models::User;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        courier_db::migrations::run(&conn).unwrap();
        conn
    }

    fn seed_user(conn: &Connection, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        queries::insert_user(conn, &user).unwrap();
        user
    }

    fn seed_message(
        conn: &Connection,
        sender: &User,
        receiver: &User,
        content: &str,
        parent: Option<Uuid>,
        offset_us: i64,
    ) -> Message {
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            receiver_id: receiver.id,
            content: content.to_string(),
            created_at: Utc::now() + Duration::microseconds(offset_us),
            is_read: false,
            edited: false,
            parent_id: parent,
        };
        queries::insert_message(conn, &message).unwrap();
        message
    }

    #[test]
    fn chain_comes_back_in_timestamp_order() {
        let conn = test_conn();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        let root = seed_message(&conn, &alice, &bob, "root", None, 0);
        let a = seed_message(&conn, &bob, &alice, "a", Some(root.id), 10);
        let b = seed_message(&conn, &alice, &bob, "b", Some(a.id), 20);
        let c = seed_message(&conn, &bob, &alice, "c", Some(b.id), 30);

        let thread = resolve_thread(&conn, root.id).unwrap();
        let ids: Vec<Uuid> = thread.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn branching_replies_are_all_collected() {
        let conn = test_conn();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        let root = seed_message(&conn, &alice, &bob, "root", None, 0);
        let left = seed_message(&conn, &bob, &alice, "left", Some(root.id), 10);
        let right = seed_message(&conn, &bob, &alice, "right", Some(root.id), 20);
        let deep = seed_message(&conn, &alice, &bob, "deep", Some(left.id), 30);

        let thread = resolve_thread(&conn, root.id).unwrap();
        let ids: Vec<Uuid> = thread.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![left.id, right.id, deep.id]);
    }

    #[test]
    fn childless_root_yields_empty_thread() {
        let conn = test_conn();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        let root = seed_message(&conn, &alice, &bob, "lonely", None, 0);
        assert!(resolve_thread(&conn, root.id).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_not_found() {
        let conn = test_conn();
        let err = resolve_thread(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn corrupted_parent_cycle_terminates_without_duplicates() {
        let conn = test_conn();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        let root = seed_message(&conn, &alice, &bob, "root", None, 0);
        let a = seed_message(&conn, &bob, &alice, "a", Some(root.id), 10);
        let b = seed_message(&conn, &alice, &bob, "b", Some(a.id), 20);

        // Corrupt the graph: point the root back into its own subtree.
        conn.execute(
            "UPDATE messages SET parent_message_id = ?1 WHERE id = ?2",
            rusqlite::params![b.id.to_string(), root.id.to_string()],
        )
        .unwrap();

        let thread = resolve_thread(&conn, root.id).unwrap();
        let ids: Vec<Uuid> = thread.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a.id, b.id], "each message visited exactly once");
    }
}
