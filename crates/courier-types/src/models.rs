use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A direct message. `parent_id`, when set, points at the message this one
/// replies to; the parent always exists at creation time, so reply chains
/// cannot contain cycles by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub edited: bool,
    pub parent_id: Option<Uuid>,
}

/// Created by the engine, exactly one per message creation. Owned by the
/// message's receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Pre-change snapshot captured on every content-changing edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditHistory {
    pub id: Uuid,
    pub message_id: Uuid,
    pub old_content: String,
    pub edited_at: DateTime<Utc>,
    pub editor_id: Uuid,
}

/// Append-only record of an account deletion. The username is denormalized
/// because the user row is gone by the time anyone reads this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionLog {
    pub id: i64,
    pub username: String,
    pub deleted_at: DateTime<Utc>,
}

/// Minimal projection used by the unread index and listing payloads.
/// `edited` and `parent_id` are intentionally absent; callers of these
/// read paths must not assume they are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// The listing views the cache keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingView {
    /// Messages received by the user, newest first.
    Inbox,
    /// Messages sent by the user, newest first.
    Outbox,
    /// Unread received messages, newest first.
    Unread,
}

/// A computed listing payload, as served to collaborators and stored in the
/// listing cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub view: ListingView,
    pub user_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub messages: Vec<MessageSummary>,
}
