//! Sliding-window abuse control for message creation, keyed by the
//! originating network identity.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use courier_types::{Error, Result};
use tracing::warn;

/// Bounds for one identity: at most `max_events` creations per `window`.
#[derive(Debug, Clone)]
pub struct RateGuardConfig {
    pub max_events: usize,
    pub window: Duration,
}

impl RateGuardConfig {
    pub const fn new(max_events: usize, window: Duration) -> Self {
        Self { max_events, window }
    }
}

impl Default for RateGuardConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

pub struct RateGuard {
    config: RateGuardConfig,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateGuard {
    pub fn new(config: RateGuardConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one creation attempt. Purges timestamps that have
    /// slid out of the window, then checks the retained count; an accepted
    /// attempt is recorded before returning.
    pub fn check(&self, identity: &str) -> Result<()> {
        self.check_at(identity, Instant::now())
    }

    fn check_at(&self, identity: &str, now: Instant) -> Result<()> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|e| Error::Storage(format!("rate guard lock poisoned: {e}")))?;

        let events = windows.entry(identity.to_string()).or_default();
        while events
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.window)
        {
            events.pop_front();
        }

        if events.len() >= self.config.max_events {
            warn!("Rate limited message creation from {}", identity);
            return Err(Error::RateLimited);
        }

        events.push_back(now);
        Ok(())
    }

    /// Drop identities with no activity left in the window. The key space
    /// grows with the identity space otherwise; the embedding process calls
    /// this periodically.
    pub fn evict_idle(&self) {
        self.evict_idle_at(Instant::now());
    }

    fn evict_idle_at(&self, now: Instant) {
        if let Ok(mut windows) = self.windows.lock() {
            windows.retain(|_, events| {
                events
                    .iter()
                    .any(|t| now.duration_since(*t) < self.config.window)
            });
        }
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}
