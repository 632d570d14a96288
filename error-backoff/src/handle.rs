use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use log::{info, warn};
use shared::IntervalName;
use tokio::time::sleep;

use crate::{
    policy::BackoffPolicy,
    tracker::{Tracker, TrackerError, TrackerSnapshot},
    window::Entry,
};

/// Cloneable handle to a single [`Tracker`].
///
/// Events take the write lock and read the clock while holding it, so
/// entries are appended in the order their timestamps were taken. Queries
/// take the read lock and never see a half applied event.
#[derive(Clone)]
pub struct SharedTracker {
    inner: Arc<RwLock<Tracker>>,
}

impl From<Tracker> for SharedTracker {
    fn from(tracker: Tracker) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tracker)),
        }
    }
}

impl SharedTracker {
    pub fn request_observed(&self) -> Result<(), TrackerError> {
        self.write().request_observed()
    }

    pub fn request_failed_observed(&self, key: impl Into<String>) -> Result<Entry, TrackerError> {
        self.write().request_failed_observed(key)
    }

    pub fn shutdown(&self) {
        self.write().shutdown()
    }

    pub fn is_shut_down(&self) -> bool {
        self.read().is_shut_down()
    }

    pub fn total_in_interval(&self, name: IntervalName) -> Result<usize, TrackerError> {
        self.read().total_in_interval(name)
    }

    pub fn entries_for_key_in_interval(
        &self,
        name: IntervalName,
        key: &str,
    ) -> Result<Vec<Entry>, TrackerError> {
        self.read().entries_for_key_in_interval(name, key)
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.read().snapshot()
    }

    pub fn should_back_off(
        &self,
        policy: &BackoffPolicy,
        key: &str,
    ) -> Result<bool, TrackerError> {
        policy.should_back_off(&self.read(), key)
    }

    /// Emits a request observed event every `period` until the tracker is
    /// shut down, keeping totals fresh while no failures arrive.
    pub async fn run_ticker(self, period: Duration) {
        info!("Starting prune ticker with period {period:?}");

        loop {
            sleep(period).await;

            match self.request_observed() {
                Ok(()) => (),
                Err(TrackerError::ShutDown) => {
                    info!("Tracker shut down, stopping prune ticker");
                    return;
                }
                Err(e) => warn!("Prune tick failed: {e}"),
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tracker> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tracker> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
