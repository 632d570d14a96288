use std::time::Duration;

use error_backoff::SharedTracker;
use futures::{StreamExt, stream::FuturesUnordered};
use log::info;
use tokio::signal::unix::{SignalKind, signal};

use crate::{config::AppConfig, stats::StatisticsManager, targets::ProbeTarget};

mod config;
mod stats;
mod targets;

#[tokio::main]
async fn main() {
    env_logger::init();

    let AppConfig {
        statistics_interval,
        backoff,
        targets: target_configs,
    } = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Error while parsing config: {e}");
            return;
        }
    };

    info!("Using backoff config: {backoff}");

    let (tracker, policy) = match backoff.build() {
        Ok((tracker, policy)) => (SharedTracker::from(tracker), policy),
        Err(e) => {
            log::error!("Invalid backoff config: {e}");
            return;
        }
    };

    let stats_manager = StatisticsManager::new(tracker.clone())
        .with_interval(Duration::from_millis(statistics_interval));

    let probes = match target_configs
        .iter()
        .inspect(|(name, config)| info!("Using target: {name} {config}"))
        .map(|(name, config)| {
            ProbeTarget::new(name, config, &stats_manager, tracker.clone(), policy)
        })
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(probes) => probes,
        Err(e) => {
            log::error!("Error while creating probe: {e}");
            return;
        }
    };

    let probe_futures = probes
        .into_iter()
        .map(ProbeTarget::run_probe)
        .collect::<FuturesUnordered<_>>();

    if let Some(period) = backoff.tick_period() {
        tokio::spawn(tracker.clone().run_ticker(period));
    }

    let _statistics_handle = tokio::spawn(stats_manager.run_statistics());

    let signals = signal(SignalKind::interrupt())
        .and_then(|sigint| Ok((sigint, signal(SignalKind::terminate())?)));
    let (mut sigint, mut sigterm) = match signals {
        Ok(signals) => signals,
        Err(e) => {
            log::error!("Failed to register signal handlers: {e}");
            return;
        }
    };

    tokio::select!(
      _ = probe_futures
          .for_each_concurrent(Option::None, async |r| match r {
              Ok(_) => (),
              Err(e) => log::error!("Error for probe target: {e}"),
          }) => {},
      _ = sigint.recv() => {
        info!("Received SIGINT, shutting down...")
      },
      _ = sigterm.recv() => {
        info!("Received SIGTERM, shutting down...")
      },
    );

    tracker.shutdown();
}
