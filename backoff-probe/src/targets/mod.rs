use std::{sync::atomic::Ordering, time::Duration};

use error_backoff::{BackoffPolicy, SharedTracker, TrackerError, fingerprint};
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use tokio::time::{Instant, sleep};

use crate::{
    config::TargetConfig,
    stats::{StatisticsManager, TargetStatistics},
    targets::{client::ProbeClient, error::ProbeError},
};

mod client;
mod error;

#[derive(Serialize)]
struct ProbeRequest<'a> {
    method: &'static str,
    target: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Succeeded,
    Failed,
    BackedOff,
}

pub(crate) struct ProbeTarget {
    name: String,
    key: String,
    client: ProbeClient,
    tracker: SharedTracker,
    policy: BackoffPolicy,
    statistics: TargetStatistics,
    client_wait: Duration,
    backoff_wait: Duration,
    backoff_jitter: u64,
}

impl ProbeTarget {
    pub(crate) fn new(
        name: &str,
        target_config: &TargetConfig,
        stats: &StatisticsManager,
        tracker: SharedTracker,
        policy: BackoffPolicy,
    ) -> Result<Self, ProbeError> {
        let client = ProbeClient::new(target_config)?;
        let key = fingerprint(&ProbeRequest {
            method: "GET",
            target: client.target(),
        })?;

        Ok(Self {
            name: name.to_owned(),
            key,
            client,
            tracker,
            policy,
            statistics: stats.create_stats_for_target(name),
            client_wait: target_config.client_wait(),
            backoff_wait: target_config.backoff_wait(),
            backoff_jitter: target_config.backoff_jitter,
        })
    }

    /// One probe: age the windows, consult the policy, then send unless
    /// the target has failed too often recently.
    pub(crate) async fn probe_once(&self) -> Result<ProbeOutcome, TrackerError> {
        self.tracker.request_observed()?;

        if self.tracker.should_back_off(&self.policy, &self.key)? {
            self.statistics.backoffs.fetch_add(1, Ordering::Relaxed);
            return Ok(ProbeOutcome::BackedOff);
        }

        let request_start_time = Instant::now();

        match self.client.get().await {
            Ok(_) => {
                self.statistics.requests.fetch_add(1, Ordering::Relaxed);
                self.statistics.response_time_acc.fetch_add(
                    request_start_time.elapsed().as_millis() as usize,
                    Ordering::Relaxed,
                );

                Ok(ProbeOutcome::Succeeded)
            }
            Err(e) => {
                warn!("Request for target: {} failed: {e}", self.name);
                self.tracker.request_failed_observed(self.key.as_str())?;
                self.statistics.failures.fetch_add(1, Ordering::Relaxed);

                Ok(ProbeOutcome::Failed)
            }
        }
    }

    pub(crate) async fn run_probe(self) -> Result<(), ProbeError> {
        info!("Probing target: {} with key: {}", self.name, self.key);

        loop {
            let wait = match self.probe_once().await {
                Ok(ProbeOutcome::BackedOff) => {
                    let wait = self.backoff_wait + self.jitter();
                    debug!("Backing off target: {} for {wait:?}", self.name);
                    wait
                }
                Ok(_) => self.client_wait,
                Err(TrackerError::ShutDown) => {
                    info!("Stopping probe for target: {}", self.name);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            sleep(wait).await;
        }
    }

    fn jitter(&self) -> Duration {
        Duration::from_millis(rand::rng().random_range(0..=self.backoff_jitter))
    }
}
