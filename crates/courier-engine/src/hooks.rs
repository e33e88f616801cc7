//! Reactions fired synchronously inside the transaction of the triggering
//! write, on three event classes: post-create, pre-update, post-delete.
//!
//! Each reaction is a plain function; the dispatcher holds an explicit
//! ordered list per event class and nothing registers itself globally. A
//! reaction error aborts the whole transaction, so side effects either all
//! land with the primary write or not at all.

use chrono::Utc;
use courier_db::queries;
use courier_types::Result;
use courier_types::models::{EditHistory, Message, Notification, User};
use rusqlite::Transaction;
use tracing::debug;
use uuid::Uuid;

use crate::cache::ListingCache;

/// What a reaction gets to work with: the enclosing transaction and the
/// in-process listing cache.
pub struct HookContext<'a, 'conn> {
    pub tx: &'a Transaction<'conn>,
    pub cache: &'a ListingCache,
}

pub type PostCreateFn = fn(&HookContext<'_, '_>, &Message) -> Result<()>;

/// Old state is `None` when the triggering write turns out to be a create;
/// reactions must treat that as a no-op, never an error.
pub type PreUpdateFn = fn(&HookContext<'_, '_>, Option<&Message>, &mut Message, Uuid) -> Result<()>;

pub type PostDeleteFn = fn(&HookContext<'_, '_>, &User) -> Result<()>;

pub struct HookDispatcher {
    post_create: Vec<PostCreateFn>,
    pre_update: Vec<PreUpdateFn>,
    post_delete: Vec<PostDeleteFn>,
}

impl Default for HookDispatcher {
    /// The standard reaction set: notification + cache invalidation on
    /// create, history capture on edit, deletion log + cascade on user
    /// removal.
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.on_post_create(notify_receiver);
        dispatcher.on_post_create(invalidate_receiver_listings);
        dispatcher.on_pre_update(capture_edit_history);
        dispatcher.on_post_delete(record_deletion);
        dispatcher.on_post_delete(cascade_messages);
        dispatcher.on_post_delete(cascade_notifications);
        dispatcher.on_post_delete(cascade_edit_history);
        dispatcher
    }
}

impl HookDispatcher {
    pub fn empty() -> Self {
        Self {
            post_create: Vec::new(),
            pre_update: Vec::new(),
            post_delete: Vec::new(),
        }
    }

    pub fn on_post_create(&mut self, reaction: PostCreateFn) {
        self.post_create.push(reaction);
    }

    pub fn on_pre_update(&mut self, reaction: PreUpdateFn) {
        self.pre_update.push(reaction);
    }

    pub fn on_post_delete(&mut self, reaction: PostDeleteFn) {
        self.post_delete.push(reaction);
    }

    pub fn fire_post_create(&self, ctx: &HookContext<'_, '_>, message: &Message) -> Result<()> {
        for reaction in &self.post_create {
            reaction(ctx, message)?;
        }
        Ok(())
    }

    pub fn fire_pre_update(
        &self,
        ctx: &HookContext<'_, '_>,
        old: Option<&Message>,
        new: &mut Message,
        editor: Uuid,
    ) -> Result<()> {
        for reaction in &self.pre_update {
            reaction(ctx, old, new, editor)?;
        }
        Ok(())
    }

    pub fn fire_post_delete(&self, ctx: &HookContext<'_, '_>, user: &User) -> Result<()> {
        for reaction in &self.post_delete {
            reaction(ctx, user)?;
        }
        Ok(())
    }
}

// -- Standard reactions --

/// Exactly one notification per created message, owned by the receiver.
pub fn notify_receiver(ctx: &HookContext<'_, '_>, message: &Message) -> Result<()> {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: message.receiver_id,
        message_id: message.id,
        created_at: Utc::now(),
        is_read: false,
    };
    queries::insert_notification(ctx.tx, &notification)?;
    debug!(
        "Notified {} about message {}",
        message.receiver_id, message.id
    );
    Ok(())
}

/// New messages make the receiver's cached listings stale; drop them now
/// rather than waiting out the TTL.
pub fn invalidate_receiver_listings(ctx: &HookContext<'_, '_>, message: &Message) -> Result<()> {
    ctx.cache.invalidate_user(message.receiver_id);
    Ok(())
}

/// Snapshot the previous content when an update actually changes it, and
/// flag the message as edited. No-op on unchanged content and on creates.
pub fn capture_edit_history(
    ctx: &HookContext<'_, '_>,
    old: Option<&Message>,
    new: &mut Message,
    editor: Uuid,
) -> Result<()> {
    let Some(old) = old else {
        return Ok(());
    };
    if old.content == new.content {
        return Ok(());
    }

    let entry = EditHistory {
        id: Uuid::new_v4(),
        message_id: new.id,
        old_content: old.content.clone(),
        edited_at: Utc::now(),
        editor_id: editor,
    };
    queries::insert_edit_history(ctx.tx, &entry)?;
    new.edited = true;

    debug!("Recorded edit of message {} by {}", new.id, editor);
    Ok(())
}

/// The username is written out before the user row disappears.
pub fn record_deletion(ctx: &HookContext<'_, '_>, user: &User) -> Result<()> {
    queries::insert_deletion_log(ctx.tx, &user.username, Utc::now())
}

pub fn cascade_messages(ctx: &HookContext<'_, '_>, user: &User) -> Result<()> {
    let deleted = queries::delete_messages_for_user(ctx.tx, user.id)?;
    debug!("Cascade removed {} message(s) of {}", deleted, user.username);
    Ok(())
}

pub fn cascade_notifications(ctx: &HookContext<'_, '_>, user: &User) -> Result<()> {
    queries::delete_notifications_for_user(ctx.tx, user.id)?;
    Ok(())
}

pub fn cascade_edit_history(ctx: &HookContext<'_, '_>, user: &User) -> Result<()> {
    queries::delete_history_by_editor(ctx.tx, user.id)?;
    Ok(())
}
