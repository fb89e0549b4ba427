use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::DispatchError;
use crate::sink::MetricSink;
use rfmon_common::settings::PluginSettings;
use rfmon_redfish::error::RedfishError;
use rfmon_redfish::SensorSource;
use std::sync::Arc;
use std::time::Instant;

/// What happened during one read cycle. Failures are already logged by the
/// time the outcome is returned.
#[derive(Debug)]
pub enum CycleOutcome {
    Dispatched(DispatchReport),
    FetchFailed(RedfishError),
    DispatchFailed(DispatchError),
}

/// Runs read cycles for one plugin instance: fetch, then dispatch.
pub struct Poller {
    source: Box<dyn SensorSource>,
    sink: Arc<dyn MetricSink>,
    dispatcher: Dispatcher,
    settings: PluginSettings,
}

impl Poller {
    pub fn new(source: Box<dyn SensorSource>, sink: Arc<dyn MetricSink>, settings: PluginSettings) -> Self {
        Self {
            source,
            sink,
            dispatcher: Dispatcher::new(settings.clone()),
            settings,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Runs one cycle. Never fails: errors are logged and the cycle is
    /// abandoned until the next tick.
    pub async fn read_cycle(&self) -> CycleOutcome {
        let start = Instant::now();
        let stats = match self.source.fetch().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(
                    prefix = %self.settings.prefix,
                    source = self.source.name(),
                    error = %e,
                    detail = ?e,
                    "Failed to get stats"
                );
                return CycleOutcome::FetchFailed(e);
            }
        };

        if self.settings.verbose {
            tracing::info!(
                prefix = %self.settings.prefix,
                source = self.source.name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Collected new data from service"
            );
        }

        match self.dispatcher.dispatch(&stats, self.sink.as_ref()) {
            Ok(report) => {
                tracing::debug!(
                    source = self.source.name(),
                    emitted = report.emitted,
                    failed = report.failed,
                    "Cycle dispatched"
                );
                CycleOutcome::Dispatched(report)
            }
            Err(e) => {
                tracing::error!(
                    prefix = %self.settings.prefix,
                    source = self.source.name(),
                    error = %e,
                    "Failed to dispatch values"
                );
                CycleOutcome::DispatchFailed(e)
            }
        }
    }
}
