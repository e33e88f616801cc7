//! Time-boxed cache of computed listing payloads, keyed by (view, user).
//!
//! Invalidation on new-message events only clears the receiver's keys;
//! anything else ages out within the TTL. Bounded staleness is the contract,
//! not instantaneous consistency, so a single mutex around the map is enough.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use courier_types::models::{Listing, ListingView};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

pub struct ListingCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<(ListingView, Uuid), CacheEntry>,
    hits: u64,
    misses: u64,
}

struct CacheEntry {
    listing: Listing,
    stored_at: Instant,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, view: ListingView, user_id: Uuid) -> Option<Listing> {
        self.get_at(view, user_id, Instant::now())
    }

    fn get_at(&self, view: ListingView, user_id: Uuid, now: Instant) -> Option<Listing> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let key = (view, user_id);

        let fresh = inner.entries.get(&key).and_then(|entry| {
            (now.duration_since(entry.stored_at) < self.ttl).then(|| entry.listing.clone())
        });

        match fresh {
            Some(listing) => {
                inner.hits += 1;
                debug!("Listing cache hit for {:?}/{}", view, user_id);
                Some(listing)
            }
            None => {
                // Expired entries are dropped on the way out.
                inner.entries.remove(&key);
                inner.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, view: ListingView, user_id: Uuid, listing: Listing) {
        self.put_at(view, user_id, listing, Instant::now());
    }

    fn put_at(&self, view: ListingView, user_id: Uuid, listing: Listing, now: Instant) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.insert(
                (view, user_id),
                CacheEntry {
                    listing,
                    stored_at: now,
                },
            );
        }
    }

    /// Drop every cached view for one user. Fired on new-message events for
    /// the receiver; other users' cached listings are left to age out.
    pub fn invalidate_user(&self, user_id: Uuid) {
        if let Ok(mut inner) = self.inner.lock() {
            let before = inner.entries.len();
            inner.entries.retain(|(_, uid), _| *uid != user_id);
            let dropped = before - inner.entries.len();
            if dropped > 0 {
                debug!("Invalidated {} cached listing(s) for {}", dropped, user_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> (u64, u64) {
        self.inner
            .lock()
            .map(|inner| (inner.hits, inner.misses))
            .unwrap_or((0, 0))
    }
}
