use shared::IntervalName;

use crate::window::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("Unknown interval: {0}")]
    UnknownInterval(IntervalName),
    #[error("Entry at {timestamp} is older than the tail of interval {interval} at {tail}")]
    OutOfOrder {
        interval: IntervalName,
        tail: Timestamp,
        timestamp: Timestamp,
    },
    #[error("Tracker has been shut down")]
    ShutDown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No intervals configured")]
    EmptyIntervals,
    #[error("Interval {0} configured more than once")]
    DuplicateInterval(IntervalName),
    #[error("Interval {0} must have a positive duration")]
    NonPositiveDuration(IntervalName),
    #[error("Backoff policy interval {0} is not a tracked interval")]
    UntrackedPolicyInterval(IntervalName),
    #[error("Error capacity must be at least 1")]
    ZeroErrorCapacity,
}
