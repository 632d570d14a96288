use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use error_backoff::SharedTracker;
use log::info;
use tokio::time::{Instant, sleep};

pub(crate) struct StatisticsManager {
    target_stats: Arc<RwLock<HashMap<String, TargetStatistics>>>,
    tracker: SharedTracker,
    interval: Duration,
}

impl StatisticsManager {
    pub(crate) fn new(tracker: SharedTracker) -> Self {
        Self {
            target_stats: Default::default(),
            tracker,
            interval: Duration::from_millis(1000),
        }
    }

    pub(crate) fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub(crate) fn create_stats_for_target(&self, target_name: &str) -> TargetStatistics {
        let mut guard = self
            .target_stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stats = TargetStatistics::default();

        guard.insert(target_name.to_owned(), stats.clone());

        stats
    }

    pub(crate) async fn run_statistics(self) {
        loop {
            let iteration_start_time = Instant::now();
            sleep(self.interval).await;

            if self.tracker.is_shut_down() {
                return;
            }

            info!("Failure windows: {}", self.tracker.snapshot());

            let guard = self
                .target_stats
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            guard.iter().for_each(|(name, stats)| {
                self.log_statistic(name, stats, iteration_start_time);
            });
        }
    }

    fn log_statistic(&self, name: &str, stats: &TargetStatistics, iteration_start_time: Instant) {
        let requests_for_iteration = stats.requests.swap(0, Ordering::Relaxed);
        let failures_for_iteration = stats.failures.swap(0, Ordering::Relaxed);
        let backoffs_for_iteration = stats.backoffs.swap(0, Ordering::Relaxed);
        let request_time_acc = stats.response_time_acc.swap(0, Ordering::Relaxed);

        let seconds_elapsed = iteration_start_time.elapsed().as_secs_f64();

        let requests_per_second = requests_for_iteration as f64 / seconds_elapsed;
        let average_response_time = request_time_acc
            .checked_div(requests_for_iteration)
            .unwrap_or_default();

        info!(
            "Stats for target: {}, requests/s: {}, failures: {}, backoffs: {}, avg response time: {}ms",
            name,
            requests_per_second as usize,
            failures_for_iteration,
            backoffs_for_iteration,
            average_response_time,
        );
    }
}

#[derive(Default, Clone)]
pub(crate) struct TargetStatistics {
    pub requests: Arc<AtomicUsize>,
    pub failures: Arc<AtomicUsize>,
    pub backoffs: Arc<AtomicUsize>,
    pub response_time_acc: Arc<AtomicUsize>,
}
