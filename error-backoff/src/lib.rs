//! Sliding window accounting of failed upstream requests.
//!
//! A [`Tracker`] keeps, for every configured interval, the failures seen
//! within that interval's duration. Callers feed it `request observed` and
//! `request failed` events and read totals or per key failures back to decide
//! whether to back off. Pruning only happens when an event arrives.

pub mod clock;
pub mod config;
pub mod fingerprint;
pub mod handle;
pub mod policy;
pub mod tracker;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoadError, TrackerConfig};
pub use fingerprint::{FingerprintError, Fingerprinter, fingerprint};
pub use handle::SharedTracker;
pub use policy::BackoffPolicy;
pub use shared::IntervalName;
pub use tracker::{
    ConfigError, Interval, IntervalTotal, Tracker, TrackerError, TrackerSnapshot,
};
pub use window::{Entry, Timestamp};
