use courier_types::models::{DeletionLog, EditHistory, Message, MessageSummary, Notification, User};
use courier_types::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::map_sqlite_err;
use crate::models::{
    DeletionLogRow, EditHistoryRow, MessageRow, NotificationRow, UserRow, format_timestamp,
};

// -- Users --

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
        params![
            user.id.to_string(),
            user.username,
            format_timestamp(user.created_at)
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: Uuid) -> Result<User> {
    let row = conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(map_sqlite_err)?
        .ok_or_else(|| Error::NotFound(format!("user {id}")))?;
    Ok(row.into_user())
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
            [username],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(map_sqlite_err)?;
    Ok(row.map(UserRow::into_user))
}

pub fn delete_user_row(conn: &Connection, id: Uuid) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM users WHERE id = ?1", [id.to_string()])
        .map_err(map_sqlite_err)?;
    if changed == 0 {
        return Err(Error::NotFound(format!("user {id}")));
    }
    Ok(())
}

// -- Messages --

pub fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages
            (id, sender_id, receiver_id, content, created_at, is_read, edited, parent_message_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            message.id.to_string(),
            message.sender_id.to_string(),
            message.receiver_id.to_string(),
            message.content,
            format_timestamp(message.created_at),
            message.is_read,
            message.edited,
            message.parent_id.map(|id| id.to_string()),
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: Uuid) -> Result<Message> {
    let row = conn
        .query_row(
            "SELECT id, sender_id, receiver_id, content, created_at, is_read, edited, parent_message_id
             FROM messages WHERE id = ?1",
            [id.to_string()],
            map_message_row,
        )
        .optional()
        .map_err(map_sqlite_err)?
        .ok_or_else(|| Error::NotFound(format!("message {id}")))?;
    Ok(row.into_message())
}

/// Persist a content/edited change. The immutable columns are left alone.
pub fn update_message(conn: &Connection, message: &Message) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE messages SET content = ?2, edited = ?3 WHERE id = ?1",
            params![message.id.to_string(), message.content, message.edited],
        )
        .map_err(map_sqlite_err)?;
    if changed == 0 {
        return Err(Error::NotFound(format!("message {}", message.id)));
    }
    Ok(())
}

pub fn mark_read(conn: &Connection, id: Uuid) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(map_sqlite_err)?;
    if changed == 0 {
        return Err(Error::NotFound(format!("message {id}")));
    }
    Ok(())
}

/// Direct replies to a message, oldest first.
pub fn replies_of(conn: &Connection, parent_id: Uuid) -> Result<Vec<Message>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, sender_id, receiver_id, content, created_at, is_read, edited, parent_message_id
             FROM messages WHERE parent_message_id = ?1
             ORDER BY created_at ASC",
        )
        .map_err(map_sqlite_err)?;

    let rows = stmt
        .query_map([parent_id.to_string()], map_message_row)
        .map_err(map_sqlite_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    Ok(rows.into_iter().map(MessageRow::into_message).collect())
}

const SUMMARY_COLUMNS: &str = "id, sender_id, receiver_id, content, created_at, is_read";

pub fn messages_received(conn: &Connection, user_id: Uuid) -> Result<Vec<MessageSummary>> {
    summaries(
        conn,
        &format!(
            "SELECT {SUMMARY_COLUMNS} FROM messages
             WHERE receiver_id = ?1 ORDER BY created_at DESC"
        ),
        user_id,
    )
}

pub fn messages_sent(conn: &Connection, user_id: Uuid) -> Result<Vec<MessageSummary>> {
    summaries(
        conn,
        &format!(
            "SELECT {SUMMARY_COLUMNS} FROM messages
             WHERE sender_id = ?1 ORDER BY created_at DESC"
        ),
        user_id,
    )
}

/// The unread index: unread messages for a receiver, minimal columns only.
pub fn unread_for(conn: &Connection, user_id: Uuid) -> Result<Vec<MessageSummary>> {
    summaries(
        conn,
        &format!(
            "SELECT {SUMMARY_COLUMNS} FROM messages
             WHERE receiver_id = ?1 AND is_read = 0 ORDER BY created_at DESC"
        ),
        user_id,
    )
}

fn summaries(conn: &Connection, sql: &str, user_id: Uuid) -> Result<Vec<MessageSummary>> {
    let mut stmt = conn.prepare(sql).map_err(map_sqlite_err)?;

    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                is_read: row.get(5)?,
                edited: false,
                parent_message_id: None,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    Ok(rows.into_iter().map(MessageRow::into_summary).collect())
}

// -- Notifications --

pub fn insert_notification(conn: &Connection, notification: &Notification) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, message_id, created_at, is_read)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            notification.id.to_string(),
            notification.user_id.to_string(),
            notification.message_id.to_string(),
            format_timestamp(notification.created_at),
            notification.is_read,
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn notifications_for(conn: &Connection, user_id: Uuid) -> Result<Vec<Notification>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, message_id, created_at, is_read
             FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .map_err(map_sqlite_err)?;

    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(NotificationRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message_id: row.get(2)?,
                created_at: row.get(3)?,
                is_read: row.get(4)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    Ok(rows
        .into_iter()
        .map(NotificationRow::into_notification)
        .collect())
}

pub fn mark_notification_read(conn: &Connection, id: Uuid) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(map_sqlite_err)?;
    if changed == 0 {
        return Err(Error::NotFound(format!("notification {id}")));
    }
    Ok(())
}

// -- Edit history --

pub fn insert_edit_history(conn: &Connection, entry: &EditHistory) -> Result<()> {
    conn.execute(
        "INSERT INTO message_history (id, message_id, old_content, edited_at, editor_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id.to_string(),
            entry.message_id.to_string(),
            entry.old_content,
            format_timestamp(entry.edited_at),
            entry.editor_id.to_string(),
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn history_for(conn: &Connection, message_id: Uuid) -> Result<Vec<EditHistory>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, message_id, old_content, edited_at, editor_id
             FROM message_history WHERE message_id = ?1 ORDER BY edited_at DESC",
        )
        .map_err(map_sqlite_err)?;

    let rows = stmt
        .query_map([message_id.to_string()], |row| {
            Ok(EditHistoryRow {
                id: row.get(0)?,
                message_id: row.get(1)?,
                old_content: row.get(2)?,
                edited_at: row.get(3)?,
                editor_id: row.get(4)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    Ok(rows.into_iter().map(EditHistoryRow::into_history).collect())
}

// -- Deletion log --

pub fn insert_deletion_log(
    conn: &Connection,
    username: &str,
    deleted_at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO deletion_log (username, deleted_at) VALUES (?1, ?2)",
        params![username, format_timestamp(deleted_at)],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn deletion_logs_for(conn: &Connection, username: &str) -> Result<Vec<DeletionLog>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, username, deleted_at FROM deletion_log
             WHERE username = ?1 ORDER BY deleted_at DESC",
        )
        .map_err(map_sqlite_err)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(DeletionLogRow {
                id: row.get(0)?,
                username: row.get(1)?,
                deleted_at: row.get(2)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    Ok(rows.into_iter().map(DeletionLogRow::into_log).collect())
}

// -- Cascade deletes (user removal) --

/// Delete every message the user sent or received. Notifications and edit
/// history attached to those messages fall with them via FK cascade.
pub fn delete_messages_for_user(conn: &Connection, user_id: Uuid) -> Result<usize> {
    conn.execute(
        "DELETE FROM messages WHERE sender_id = ?1 OR receiver_id = ?1",
        [user_id.to_string()],
    )
    .map_err(map_sqlite_err)
}

pub fn delete_notifications_for_user(conn: &Connection, user_id: Uuid) -> Result<usize> {
    conn.execute(
        "DELETE FROM notifications WHERE user_id = ?1",
        [user_id.to_string()],
    )
    .map_err(map_sqlite_err)
}

pub fn delete_history_by_editor(conn: &Connection, user_id: Uuid) -> Result<usize> {
    conn.execute(
        "DELETE FROM message_history WHERE editor_id = ?1",
        [user_id.to_string()],
    )
    .map_err(map_sqlite_err)
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        is_read: row.get(5)?,
        edited: row.get(6)?,
        parent_message_id: row.get(7)?,
    })
}
