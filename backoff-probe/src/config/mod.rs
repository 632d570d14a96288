use std::{collections::HashMap, fmt::Display, time::Duration};

use error_backoff::TrackerConfig;
use figment::{Figment, providers::Env};
use serde::Deserialize;

fn default_statistics_interval() -> u64 {
    1000
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppConfig {
    #[serde(default = "default_statistics_interval")]
    pub statistics_interval: u64,
    #[serde(default)]
    pub backoff: TrackerConfig,
    pub targets: HashMap<String, TargetConfig>,
}

impl AppConfig {
    pub(crate) fn from_env() -> Result<Self, figment::Error> {
        Self::from_figment(Figment::new().merge(Env::prefixed("APP_").split("__")))
    }

    pub(crate) fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }
}

fn default_client_timeout() -> u64 {
    5000
}

fn default_client_wait() -> u64 {
    250
}

fn default_backoff_wait() -> u64 {
    5000
}

fn default_backoff_jitter() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TargetConfig {
    pub target: String,
    #[serde(default = "default_client_timeout")]
    pub client_timeout: u64,
    #[serde(default = "default_client_wait")]
    pub client_wait: u64,
    #[serde(default = "default_backoff_wait")]
    pub backoff_wait: u64,
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: u64,
}

impl TargetConfig {
    pub(crate) fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout)
    }

    pub(crate) fn client_wait(&self) -> Duration {
        Duration::from_millis(self.client_wait)
    }

    pub(crate) fn backoff_wait(&self) -> Duration {
        Duration::from_millis(self.backoff_wait)
    }
}

impl Display for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(
            format!(
                "{{target: \"{}\", client_timeout: \"{}\", client_wait: \"{}\", backoff_wait: \"{}\", backoff_jitter: \"{}\"}}",
                self.target,
                self.client_timeout,
                self.client_wait,
                self.backoff_wait,
                self.backoff_jitter,
            )
            .as_str(),
        )
    }
}
