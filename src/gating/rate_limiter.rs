//! Process-wide minimum-interval gate backed by a durable store.

use crate::storage::RateLimitStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Enforces a minimum interval between accepted requests.
///
/// The last accepted timestamp is cached in memory and mirrored to the store
/// on every acceptance. The check and the write in [`RateLimiter::allow`]
/// happen under one lock, so concurrent callers cannot both pass.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    min_interval_seconds: i64,
    last_accepted: Mutex<Option<i64>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval_seconds", &self.min_interval_seconds)
            .field("last_accepted", &*self.last_accepted.lock())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter, seeding its state from the store.
    ///
    /// An unreadable store is treated as "never accepted".
    pub fn new(store: Arc<dyn RateLimitStore>, min_interval_seconds: i64) -> Self {
        let last_accepted = match store.load() {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Rate-limit state unreadable, starting with an open window");
                None
            }
        };

        info!(
            min_interval_seconds = min_interval_seconds,
            last_accepted = ?last_accepted,
            "Rate limiter initialized"
        );

        Self {
            store,
            min_interval_seconds,
            last_accepted: Mutex::new(last_accepted),
        }
    }

    /// Whether a request at `now` would be accepted. No side effects.
    pub fn is_open(&self, now: i64) -> bool {
        let last = self.last_accepted.lock();
        window_open(*last, now, self.min_interval_seconds)
    }

    /// Accept a request at `now` if the window is open, stamping
    /// `last_accepted = now` before returning `true`.
    ///
    /// The store write happens under the same lock as the check, so the
    /// persisted value always matches the latest acceptance. A slow store
    /// therefore delays concurrent gate checks for the length of one write;
    /// stores are expected to be a single small local write.
    pub fn allow(&self, now: i64) -> bool {
        let mut last = self.last_accepted.lock();
        if !window_open(*last, now, self.min_interval_seconds) {
            debug!(now = now, last_accepted = ?*last, "Rate limit window closed");
            return false;
        }

        *last = Some(now);
        // The in-memory stamp stands even if persistence fails
        if let Err(e) = self.store.save(now) {
            error!(error = %e, now = now, "Failed to persist rate-limit state");
        }
        true
    }

    pub fn last_accepted(&self) -> Option<i64> {
        *self.last_accepted.lock()
    }
}

fn window_open(last_accepted: Option<i64>, now: i64, min_interval_seconds: i64) -> bool {
    match last_accepted {
        None => true,
        Some(last) => now.saturating_sub(last) >= min_interval_seconds,
    }
}
