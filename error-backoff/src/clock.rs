use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::time::Instant;

use crate::window::Timestamp;

/// Source of "now" for the tracker, read once per event.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;
}

/// Wall clock anchored at construction and advanced by a monotonic instant,
/// so readings never go backwards when the system time is adjusted.
#[derive(Debug)]
pub struct SystemClock {
    anchor_ms: Timestamp,
    anchor: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        let anchor_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or_default();

        Self {
            anchor_ms,
            anchor: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        self.anchor_ms
            .saturating_add(self.anchor.elapsed().as_millis() as Timestamp)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: Timestamp) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: Timestamp) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, by_ms: Timestamp) {
        self.now_ms.fetch_add(by_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now_ms.load(Ordering::Relaxed)
    }
}
