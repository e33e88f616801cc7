//! Database row types that map directly to SQLite rows.
//! Distinct from the courier-types domain models to keep the DB layer
//! independent; conversion happens at this boundary.

use chrono::{DateTime, SecondsFormat, Utc};
use courier_types::models::{DeletionLog, EditHistory, Message, MessageSummary, Notification, User};
use tracing::warn;
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: String,
    pub is_read: bool,
    pub edited: bool,
    pub parent_message_id: Option<String>,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub created_at: String,
    pub is_read: bool,
}

pub struct EditHistoryRow {
    pub id: String,
    pub message_id: String,
    pub old_content: String,
    pub edited_at: String,
    pub editor_id: String,
}

pub struct DeletionLogRow {
    pub id: i64,
    pub username: String,
    pub deleted_at: String,
}

/// Fixed-width RFC 3339 so that SQLite's string ordering agrees with
/// chronological ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: parse_id(&self.id),
            username: self.username,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        Message {
            id: parse_id(&self.id),
            sender_id: parse_id(&self.sender_id),
            receiver_id: parse_id(&self.receiver_id),
            content: self.content,
            created_at: parse_timestamp(&self.created_at),
            is_read: self.is_read,
            edited: self.edited,
            parent_id: self.parent_message_id.as_deref().map(parse_id),
        }
    }

    pub fn into_summary(self) -> MessageSummary {
        MessageSummary {
            id: parse_id(&self.id),
            sender_id: parse_id(&self.sender_id),
            receiver_id: parse_id(&self.receiver_id),
            content: self.content,
            created_at: parse_timestamp(&self.created_at),
            is_read: self.is_read,
        }
    }
}

impl NotificationRow {
    pub fn into_notification(self) -> Notification {
        Notification {
            id: parse_id(&self.id),
            user_id: parse_id(&self.user_id),
            message_id: parse_id(&self.message_id),
            created_at: parse_timestamp(&self.created_at),
            is_read: self.is_read,
        }
    }
}

impl EditHistoryRow {
    pub fn into_history(self) -> EditHistory {
        EditHistory {
            id: parse_id(&self.id),
            message_id: parse_id(&self.message_id),
            old_content: self.old_content,
            edited_at: parse_timestamp(&self.edited_at),
            editor_id: parse_id(&self.editor_id),
        }
    }
}

impl DeletionLogRow {
    pub fn into_log(self) -> DeletionLog {
        DeletionLog {
            id: self.id,
            username: self.username,
            deleted_at: parse_timestamp(&self.deleted_at),
        }
    }
}
