mod config;

use anyhow::Result;
use rfmon_collector::poll::Poller;
use rfmon_collector::sink::build_sink;
use rfmon_redfish::fetcher::RedfishFetcher;
use std::sync::Arc;
use sysinfo::System;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

/// Polls one plugin until shutdown. A slow cycle delays the next tick
/// instead of overlapping it.
async fn run_poller(poller: Poller, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(poller.settings().interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                poller.read_cycle().await;
            }
            _ = shutdown.changed() => {
                tracing::debug!(plugin = poller.name(), "Poll loop stopped");
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries PUTVAL lines, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("rfmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    let config = config::AgentConfig::load(&config_path)?;
    for unknown in config.unknown_keys() {
        tracing::warn!(section = %unknown.section, key = %unknown.key, "Unknown config key");
    }

    let hostname = System::host_name().unwrap_or_else(|| "localhost".to_string());
    let plan = config.resolve(&hostname)?;
    let sink = build_sink(plan.output);

    tracing::info!(
        config = %config_path,
        plugins = plan.plugins.len(),
        output = %plan.output,
        "rfmon-agent starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::with_capacity(plan.plugins.len());

    for plugin in plan.plugins {
        let settings = plugin.settings.clone();
        let fetcher = RedfishFetcher::new(&plugin.endpoint, plugin.credentials, plugin.profile, plugin.settings)?;
        tracing::info!(
            plugin = %format!("{}-{}", settings.prefix, fetcher.profile().name),
            endpoint = %fetcher.endpoint(),
            host = %settings.hostname,
            interval_secs = settings.interval.as_secs_f64(),
            "Starting poll loop"
        );
        let poller = Poller::new(Box::new(fetcher), Arc::clone(&sink), settings);
        tasks.push(tokio::spawn(run_poller(poller, shutdown_rx.clone())));
    }

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    // Receivers only go away when their loops have already exited.
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Poll task panicked");
        }
    }

    Ok(())
}
