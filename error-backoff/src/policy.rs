use log::debug;
use shared::IntervalName;

use crate::tracker::{ConfigError, Tracker, TrackerError};

/// Backs off from a key once it has failed `error_capacity` times within
/// `interval`, counted as of the last event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    interval: IntervalName,
    error_capacity: usize,
}

impl BackoffPolicy {
    pub fn new(interval: IntervalName, error_capacity: usize) -> Result<Self, ConfigError> {
        if error_capacity == 0 {
            return Err(ConfigError::ZeroErrorCapacity);
        }

        Ok(Self {
            interval,
            error_capacity,
        })
    }

    pub fn interval(&self) -> IntervalName {
        self.interval
    }

    pub fn error_capacity(&self) -> usize {
        self.error_capacity
    }

    pub fn failures_for(&self, tracker: &Tracker, key: &str) -> Result<usize, TrackerError> {
        tracker
            .entries_for_key_in_interval(self.interval, key)
            .map(|entries| entries.len())
    }

    pub fn should_back_off(&self, tracker: &Tracker, key: &str) -> Result<bool, TrackerError> {
        let failures = self.failures_for(tracker, key)?;

        if failures >= self.error_capacity {
            debug!(
                "Key {key} failed {failures} times in {}, backing off",
                self.interval
            );
            return Ok(true);
        }

        Ok(false)
    }
}
