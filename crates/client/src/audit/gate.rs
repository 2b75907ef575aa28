//! Per-origin rate gate.
//!
//! Each origin has a next-allowed instant. A caller waits until that instant
//! and receives an [`OriginTurn`] that keeps the origin locked. Booking the
//! turn pushes the instant forward by the origin's robots.txt crawl-delay (or
//! the default delay) measured from the moment of booking, so callers for one
//! origin start one at a time and never closer than the delay, even when they
//! still had to wait for other resources after passing the gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use url::Url;

use crate::fetch::RobotsSource;
use crawliq_core::url::origin_of;

/// Leaky bucket of one request per origin.
pub struct OriginGate {
    slots: Mutex<HashMap<String, Arc<Mutex<Instant>>>>,
    robots: Arc<dyn RobotsSource>,
    default_delay: Duration,
}

/// An origin's turn. Holds the origin until booked or dropped; dropping
/// without booking leaves the next-allowed instant unchanged.
pub struct OriginTurn {
    next_allowed: OwnedMutexGuard<Instant>,
    delay: Duration,
}

impl OriginTurn {
    /// Mark the request as started now and release the origin.
    pub fn book(mut self) {
        let next = Instant::now() + self.delay;
        *self.next_allowed = (*self.next_allowed).max(next);
    }
}

impl OriginGate {
    pub fn new(robots: Arc<dyn RobotsSource>, default_delay: Duration) -> Self {
        Self { slots: Mutex::new(HashMap::new()), robots, default_delay }
    }

    async fn slot(&self, origin: &str) -> Arc<Mutex<Instant>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Instant::now())))
            .clone()
    }

    /// Wait for the origin's turn.
    pub async fn wait_turn(&self, url: &Url) -> OriginTurn {
        let origin = origin_of(url);
        let next_allowed = self.slot(&origin).await.lock_owned().await;

        let wait = next_allowed.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(origin = %origin, wait_ms = wait.as_millis() as u64, "waiting on origin gate");
            tokio::time::sleep_until(*next_allowed).await;
        }

        let delay = self.robots.policy(url).await.crawl_delay.unwrap_or(self.default_delay);
        OriginTurn { next_allowed, delay }
    }

    /// Forget origins that are idle and whose next-allowed instant has passed.
    ///
    /// Returns the number of origins removed.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || !slot.try_lock().is_ok_and(|next_allowed| *next_allowed <= now)
        });
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "pruned idle origins");
        }
        removed
    }
}
