use crate::error::DispatchError;
use crate::sink::MetricSink;
use chrono::{DateTime, Utc};
use rfmon_common::settings::PluginSettings;
use rfmon_common::stats::{StatEntry, StatMap, StatValue};
use rfmon_common::types::MetricEvent;

/// Outcome of a completed dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Metrics accepted by the sink.
    pub emitted: usize,
    /// Metrics the sink refused.
    pub failed: usize,
}

/// Walks a [`StatMap`] and emits one metric per numeric leaf.
///
/// Key mapping per `category -> host -> instance -> key` entry:
///
/// | value            | type  | type_instance |
/// |------------------|-------|---------------|
/// | `Leaf(v)`        | `key` | unset         |
/// | `Bucket{sub: v}` | `sub` | `key`         |
///
/// so a fetched `{"Fan1": {"fanspeed": 5000}}` is reported as
/// `fanspeed-Fan1`.
pub struct Dispatcher {
    settings: PluginSettings,
}

impl Dispatcher {
    pub fn new(settings: PluginSettings) -> Self {
        Self { settings }
    }

    /// Emits every leaf of `stats` into `sink`.
    ///
    /// Sink failures are logged and counted without stopping the walk.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoStats`] for an empty map, before anything
    /// is emitted. Returns [`DispatchError::Shape`] on a non-finite value;
    /// metrics emitted before it are not rolled back.
    pub fn dispatch(&self, stats: &StatMap, sink: &dyn MetricSink) -> Result<DispatchReport, DispatchError> {
        if stats.is_empty() {
            return Err(DispatchError::NoStats);
        }

        if self.settings.debug {
            tracing::info!(
                prefix = %self.settings.prefix,
                count = stats.leaf_count(),
                "Dispatching new stats"
            );
        }

        let now = Utc::now();
        let mut report = DispatchReport::default();

        for entry in stats.entries() {
            match entry.value {
                StatValue::Leaf(value) => {
                    self.dispatch_value(&entry, entry.key, None, *value, now, sink, &mut report)?;
                }
                StatValue::Bucket(values) => {
                    for (sub, value) in values {
                        self.dispatch_value(&entry, sub, Some(entry.key), *value, now, sink, &mut report)?;
                    }
                }
            }
        }

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_value(
        &self,
        entry: &StatEntry<'_>,
        metric_type: &str,
        type_instance: Option<&str>,
        value: f64,
        timestamp: DateTime<Utc>,
        sink: &dyn MetricSink,
        report: &mut DispatchReport,
    ) -> Result<(), DispatchError> {
        if !value.is_finite() {
            return Err(DispatchError::Shape {
                path: stat_path(entry, metric_type),
                reason: format!("value {value} is not a finite number"),
            });
        }

        let event = MetricEvent {
            timestamp,
            host: entry.host.to_string(),
            plugin: entry.category.to_string(),
            plugin_instance: Some(entry.instance.to_string()),
            metric_type: Some(metric_type.to_string()),
            type_instance: type_instance.map(str::to_string),
            value,
            interval: self.settings.interval,
        };

        match sink.emit(&event) {
            Ok(()) => {
                report.emitted += 1;
                if self.settings.debug {
                    tracing::info!(prefix = %self.settings.prefix, metric = %event, "Sent metric");
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    prefix = %self.settings.prefix,
                    sink = sink.name(),
                    metric = %event.identifier(),
                    error = %e,
                    "Failed to emit metric"
                );
            }
        }

        Ok(())
    }
}

fn stat_path(entry: &StatEntry<'_>, metric_type: &str) -> String {
    let mut path = format!("{}.{}.{}.{}", entry.category, entry.host, entry.instance, entry.key);
    if metric_type != entry.key {
        path.push('.');
        path.push_str(metric_type);
    }
    path
}
