use std::{fmt::Display, sync::Arc};

use itertools::Itertools;
use log::{debug, info, trace, warn};
use serde::Serialize;
use shared::IntervalName;

use crate::{
    clock::{Clock, SystemClock},
    window::{Entry, Timestamp, Window},
};

pub use error::{ConfigError, TrackerError};

mod error;

/// A named duration that recency is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    name: IntervalName,
    duration_ms: u64,
}

impl Interval {
    pub fn new(name: IntervalName, duration_ms: u64) -> Self {
        Self { name, duration_ms }
    }

    pub fn canonical(name: IntervalName) -> Self {
        Self::new(name, name.canonical_duration_ms())
    }

    pub fn name(&self) -> IntervalName {
        self.name
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Oldest timestamp still inside this interval as seen from `now`.
    pub fn cutoff(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.duration_ms)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}ms)", self.name, self.duration_ms)
    }
}

pub(crate) fn validate_intervals(intervals: &[Interval]) -> Result<(), ConfigError> {
    if intervals.is_empty() {
        return Err(ConfigError::EmptyIntervals);
    }

    if let Some(interval) = intervals.iter().find(|i| i.duration_ms == 0) {
        return Err(ConfigError::NonPositiveDuration(interval.name));
    }

    if let Some(name) = intervals.iter().map(Interval::name).duplicates().next() {
        return Err(ConfigError::DuplicateInterval(name));
    }

    Ok(())
}

#[derive(Debug)]
struct TrackedWindow {
    interval: Interval,
    window: Window,
}

/// Per interval record of recent request failures.
///
/// Every event captures "now" once and applies it to all configured
/// intervals, so after a failure every window ends with the same entry.
/// Queries never prune: they report the state left by the last event.
pub struct Tracker {
    windows: Vec<TrackedWindow>,
    clock: Arc<dyn Clock>,
    shut_down: bool,
}

impl Tracker {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Result<Self, ConfigError> {
        Self::with_clock(intervals, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(
        intervals: impl IntoIterator<Item = Interval>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let intervals = intervals.into_iter().collect::<Vec<_>>();
        validate_intervals(&intervals)?;

        info!(
            "Tracking failures over intervals: [{}]",
            intervals.iter().join(", ")
        );

        Ok(Self {
            windows: intervals
                .into_iter()
                .map(|interval| TrackedWindow {
                    interval,
                    window: Window::default(),
                })
                .collect(),
            clock,
            shut_down: false,
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Ages every window against the current time without recording.
    pub fn request_observed(&mut self) -> Result<(), TrackerError> {
        let now = self.clock.now_ms();
        self.request_observed_at(now)
    }

    pub fn request_observed_at(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        self.ensure_live()?;
        trace!("Request observed at {now}");

        for TrackedWindow { interval, window } in self.windows.iter_mut() {
            let removed = window.observe(interval.cutoff(now));
            if removed > 0 {
                debug!(
                    "Interval {} aged out {removed} entries, {} remain",
                    interval.name,
                    window.total()
                );
            }
        }

        Ok(())
    }

    /// Records a failure for `key` in every window and returns the entry.
    pub fn request_failed_observed(
        &mut self,
        key: impl Into<String>,
    ) -> Result<Entry, TrackerError> {
        let now = self.clock.now_ms();
        self.request_failed_observed_at(key, now)
    }

    pub fn request_failed_observed_at(
        &mut self,
        key: impl Into<String>,
        now: Timestamp,
    ) -> Result<Entry, TrackerError> {
        self.ensure_live()?;

        // Reject before touching any window so a bad timestamp cannot leave
        // the intervals disagreeing with each other.
        for TrackedWindow { interval, window } in self.windows.iter() {
            window
                .ensure_appendable(now)
                .map_err(|e| TrackerError::OutOfOrder {
                    interval: interval.name,
                    tail: e.tail,
                    timestamp: e.timestamp,
                })?;
        }

        let entry = Entry::new(key, now);
        trace!("Request failed for key {} at {now}", entry.key());

        for TrackedWindow { interval, window } in self.windows.iter_mut() {
            window
                .record(entry.clone(), interval.cutoff(now))
                .map_err(|e| TrackerError::OutOfOrder {
                    interval: interval.name,
                    tail: e.tail,
                    timestamp: e.timestamp,
                })?;
        }

        Ok(entry)
    }

    /// Empties every window. Further events are rejected; queries keep
    /// answering with the empty state.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        self.windows.iter_mut().for_each(|w| w.window.clear());
        self.shut_down = true;

        info!("Failure tracker shut down");
    }

    pub fn total_in_interval(&self, name: IntervalName) -> Result<usize, TrackerError> {
        self.window(name).map(Window::total)
    }

    pub fn entries_for_key_in_interval(
        &self,
        name: IntervalName,
        key: &str,
    ) -> Result<Vec<Entry>, TrackerError> {
        self.window(name).map(|w| w.entries_for_key(key))
    }

    pub fn entries_in_interval(&self, name: IntervalName) -> Result<Vec<Entry>, TrackerError> {
        self.window(name).map(|w| w.entries().cloned().collect())
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            shut_down: self.shut_down,
            intervals: self
                .windows
                .iter()
                .map(|w| IntervalTotal {
                    interval: w.interval,
                    total: w.window.total(),
                })
                .collect(),
        }
    }

    fn window(&self, name: IntervalName) -> Result<&Window, TrackerError> {
        self.windows
            .iter()
            .find(|w| w.interval.name == name)
            .map(|w| &w.window)
            .ok_or(TrackerError::UnknownInterval(name))
    }

    fn ensure_live(&self) -> Result<(), TrackerError> {
        if self.shut_down {
            warn!("Event rejected, tracker has been shut down");
            return Err(TrackerError::ShutDown);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalTotal {
    pub interval: Interval,
    pub total: usize,
}

/// Totals per interval as of the last event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub shut_down: bool,
    pub intervals: Vec<IntervalTotal>,
}

impl TrackerSnapshot {
    pub fn total(&self, name: IntervalName) -> Option<usize> {
        self.intervals
            .iter()
            .find(|i| i.interval.name == name)
            .map(|i| i.total)
    }
}

impl Display for TrackerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.intervals
                .iter()
                .map(|i| format!("{}: {}", i.interval.name, i.total))
                .join(", ")
        )
    }
}
