use std::{fmt::Display, time::Duration};

use figment::{Figment, providers::Env};
use itertools::Itertools;
use serde::Deserialize;
use shared::IntervalName;

use crate::{
    policy::BackoffPolicy,
    tracker::{ConfigError, Interval, Tracker, validate_intervals},
};

pub const ENV_PREFIX: &str = "BACKOFF_";

fn default_intervals() -> Vec<IntervalConfig> {
    vec![IntervalConfig {
        name: IntervalName::Minute,
        duration_ms: None,
    }]
}

fn default_error_capacity() -> usize {
    5
}

fn default_policy_interval() -> IntervalName {
    IntervalName::Minute
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Error while parsing config: {0}")]
    Extract(#[from] Box<figment::Error>),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConfig {
    pub name: IntervalName,
    /// Falls back to the name's canonical duration.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl From<&IntervalConfig> for Interval {
    fn from(value: &IntervalConfig) -> Self {
        match value.duration_ms {
            Some(duration_ms) => Interval::new(value.name, duration_ms),
            None => Interval::canonical(value.name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_intervals")]
    pub intervals: Vec<IntervalConfig>,
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,
    #[serde(default = "default_policy_interval")]
    pub policy_interval: IntervalName,
    /// Period in ms of the optional prune ticker.
    #[serde(default)]
    pub tick_interval: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
            error_capacity: default_error_capacity(),
            policy_interval: default_policy_interval(),
            tick_interval: None,
        }
    }
}

impl TrackerConfig {
    /// Reads `BACKOFF_*` variables, e.g.
    /// `BACKOFF_INTERVALS=[{name="MINUTE"},{name="HOUR",duration_ms=3600000}]`.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_figment(Figment::new().merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates a config from any figment, so callers can nest
    /// it inside their own configuration.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigLoadError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = self.intervals()?;

        if !intervals.iter().any(|i| i.name() == self.policy_interval) {
            return Err(ConfigError::UntrackedPolicyInterval(self.policy_interval));
        }

        self.policy().map(|_| ())
    }

    pub fn intervals(&self) -> Result<Vec<Interval>, ConfigError> {
        let intervals = self.intervals.iter().map(Interval::from).collect::<Vec<_>>();
        validate_intervals(&intervals)?;

        Ok(intervals)
    }

    pub fn policy(&self) -> Result<BackoffPolicy, ConfigError> {
        BackoffPolicy::new(self.policy_interval, self.error_capacity)
    }

    pub fn tick_period(&self) -> Option<Duration> {
        self.tick_interval
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Validates the whole config, then builds the tracker and the policy
    /// that reads it.
    pub fn build(&self) -> Result<(Tracker, BackoffPolicy), ConfigError> {
        self.validate()?;

        Ok((Tracker::new(self.intervals()?)?, self.policy()?))
    }
}

impl Display for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{intervals: [{}], error_capacity: \"{}\", policy_interval: \"{}\", tick_interval: \"{}\"}}",
            self.intervals
                .iter()
                .map(Interval::from)
                .join(", "),
            self.error_capacity,
            self.policy_interval,
            self.tick_interval
                .map(|t| t.to_string())
                .unwrap_or("None".to_owned()),
        )
    }
}
