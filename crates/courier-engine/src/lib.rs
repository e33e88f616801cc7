//! The messaging engine: message storage with reactive side effects,
//! thread reconstruction, an unread index, TTL-cached listings and a
//! sliding-window rate guard.
//!
//! Collaborators (HTTP views, CLI scripts) construct one [`Engine`] per
//! process, call the operations below, and tear it down with
//! [`Engine::shutdown`]. All hook-driven side effects run inside the same
//! store transaction as the triggering write, so a reader can never observe
//! a message without its notification once the write is visible.

pub mod cache;
pub mod hooks;
pub mod rate_guard;
pub mod thread;

use std::time::Duration;

use chrono::Utc;
use courier_db::{Database, queries};
use courier_types::Result;
use courier_types::models::{
    DeletionLog, EditHistory, Listing, ListingView, Message, MessageSummary, Notification, User,
};
use tracing::{debug, info};
use uuid::Uuid;

use cache::ListingCache;
use hooks::{HookContext, HookDispatcher};
use rate_guard::{RateGuard, RateGuardConfig};

pub use courier_types::Error;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_ttl: Duration,
    pub rate_guard: RateGuardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: cache::DEFAULT_TTL,
            rate_guard: RateGuardConfig::default(),
        }
    }
}

pub struct Engine {
    db: Database,
    hooks: HookDispatcher,
    cache: ListingCache,
    rate_guard: RateGuard,
}

impl Engine {
    pub fn new(db: Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    pub fn with_config(db: Database, config: EngineConfig) -> Self {
        Self::with_dispatcher(db, config, HookDispatcher::default())
    }

    /// Construct with a custom reaction set. The standard set lives in
    /// [`HookDispatcher::default`].
    pub fn with_dispatcher(db: Database, config: EngineConfig, hooks: HookDispatcher) -> Self {
        Self {
            db,
            hooks,
            cache: ListingCache::new(config.cache_ttl),
            rate_guard: RateGuard::new(config.rate_guard),
        }
    }

    // -- Users --

    pub fn create_user(&self, username: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        self.db.transaction(|tx| {
            // Check if the username is already taken
            if queries::get_user_by_username(tx, username)?.is_some() {
                return Err(Error::IntegrityViolation(format!(
                    "username taken: {username}"
                )));
            }
            queries::insert_user(tx, &user)
        })?;
        info!("Created user {}", user.username);
        Ok(user)
    }

    /// Remove a user and their entire footprint: messages sent or received,
    /// notifications owned, edit history authored. One deletion-log row is
    /// written in the same transaction; the cascade commits atomically or
    /// not at all.
    pub fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let user = self.db.transaction(|tx| {
            let user = queries::get_user(tx, user_id)?;
            let ctx = HookContext {
                tx,
                cache: &self.cache,
            };
            self.hooks.fire_post_delete(&ctx, &user)?;
            queries::delete_user_row(tx, user_id)?;
            Ok(user)
        })?;
        info!("Deleted user {} and dependent records", user.username);
        Ok(())
    }

    // -- Messages --

    /// Store a new message. The rate guard is consulted first with the
    /// caller's network identity; the post-create reactions (notification,
    /// cache invalidation) fire inside the insert transaction.
    pub fn create_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
        identity: &str,
    ) -> Result<Message> {
        self.rate_guard.check(identity)?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
            edited: false,
            parent_id,
        };

        self.db.transaction(|tx| {
            queries::insert_message(tx, &message)?;
            let ctx = HookContext {
                tx,
                cache: &self.cache,
            };
            self.hooks.fire_post_create(&ctx, &message)
        })?;

        debug!("Message {} delivered to {}", message.id, receiver_id);
        Ok(message)
    }

    /// Replace a message's content. The pre-update reactions see the
    /// pre-change snapshot before anything is written, so history capture
    /// and the `edited` flag commit together with the new content.
    pub fn update_message_content(
        &self,
        message_id: Uuid,
        new_content: &str,
        editor: Uuid,
    ) -> Result<Message> {
        self.db.transaction(|tx| {
            let old = queries::get_message(tx, message_id)?;
            let mut updated = old.clone();
            updated.content = new_content.to_string();

            let ctx = HookContext {
                tx,
                cache: &self.cache,
            };
            self.hooks
                .fire_pre_update(&ctx, Some(&old), &mut updated, editor)?;

            queries::update_message(tx, &updated)?;
            Ok(updated)
        })
    }

    pub fn get_message(&self, message_id: Uuid) -> Result<Message> {
        self.db.with_conn(|conn| queries::get_message(conn, message_id))
    }

    pub fn mark_read(&self, message_id: Uuid) -> Result<()> {
        self.db.with_conn(|conn| queries::mark_read(conn, message_id))
    }

    // -- Read paths --

    pub fn resolve_thread(&self, message_id: Uuid) -> Result<Vec<Message>> {
        self.db
            .with_conn(|conn| thread::resolve_thread(conn, message_id))
    }

    pub fn unread_for(&self, user_id: Uuid) -> Result<Vec<MessageSummary>> {
        self.db.with_conn(|conn| queries::unread_for(conn, user_id))
    }

    /// Cache-fronted listing. A hit within the TTL serves the stored payload
    /// without touching the store; a miss recomputes and re-primes the key.
    pub fn get_listing(&self, view: ListingView, user_id: Uuid) -> Result<Listing> {
        if let Some(listing) = self.cache.get(view, user_id) {
            return Ok(listing);
        }

        let listing = self.db.with_conn(|conn| {
            let messages = match view {
                ListingView::Inbox => queries::messages_received(conn, user_id)?,
                ListingView::Outbox => queries::messages_sent(conn, user_id)?,
                ListingView::Unread => queries::unread_for(conn, user_id)?,
            };
            Ok(Listing {
                view,
                user_id,
                generated_at: Utc::now(),
                messages,
            })
        })?;

        self.cache.put(view, user_id, listing.clone());
        Ok(listing)
    }

    pub fn history_for(&self, message_id: Uuid) -> Result<Vec<EditHistory>> {
        self.db.with_conn(|conn| {
            // Distinguish "never edited" from "no such message".
            queries::get_message(conn, message_id)?;
            queries::history_for(conn, message_id)
        })
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.db
            .with_conn(|conn| queries::notifications_for(conn, user_id))
    }

    pub fn mark_notification_read(&self, notification_id: Uuid) -> Result<()> {
        self.db
            .with_conn(|conn| queries::mark_notification_read(conn, notification_id))
    }

    /// Audit trail of account deletions for a username.
    pub fn deletion_log_for(&self, username: &str) -> Result<Vec<DeletionLog>> {
        self.db
            .with_conn(|conn| queries::deletion_logs_for(conn, username))
    }

    // -- Housekeeping --

    /// Drop rate-guard identities with no recent activity. The key space
    /// otherwise grows with the identity space.
    pub fn evict_idle_identities(&self) {
        self.rate_guard.evict_idle();
    }

    /// Tear down in-process state at the end of the serving process's life.
    pub fn shutdown(self) {
        let (hits, misses) = self.cache.stats();
        info!(
            "Engine shut down (cache hits: {}, misses: {}, tracked identities: {})",
            hits,
            misses,
            self.rate_guard.tracked_identities()
        );
    }
}
