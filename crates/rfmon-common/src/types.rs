use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single sensor record pulled out of a Redfish response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Metric namespace, emitted as the plugin name (e.g., `"redfish"`).
    pub category: String,
    pub hostname: String,
    /// Plugin instance, usually the sensor category (e.g., `"fan"`).
    pub instance: String,
    /// Sensor identifier as reported by the BMC (e.g., `"Fan1"`).
    pub name: String,
    /// Metric type label (e.g., `"fanspeed"`).
    pub metric_type: String,
    pub value: f64,
}

/// One metric emission, the unit handed to a metric sink.
///
/// # Examples
///
/// ```
/// use rfmon_common::types::MetricEvent;
/// use std::time::Duration;
///
/// let event = MetricEvent {
///     timestamp: chrono::Utc::now(),
///     host: "host1".to_string(),
///     plugin: "redfish".to_string(),
///     plugin_instance: Some("fan".to_string()),
///     metric_type: Some("fanspeed".to_string()),
///     type_instance: Some("Fan1".to_string()),
///     value: 5000.0,
///     interval: Duration::from_secs(60),
/// };
/// assert_eq!(event.identifier(), "host1/redfish-fan/fanspeed-Fan1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub plugin: String,
    pub plugin_instance: Option<String>,
    pub metric_type: Option<String>,
    pub type_instance: Option<String>,
    pub value: f64,
    pub interval: Duration,
}

impl MetricEvent {
    /// Collectd-style identifier: `host/plugin[-instance]/type[-type_instance]`.
    ///
    /// An unset type is rendered as `gauge`, the generic collectd value type.
    pub fn identifier(&self) -> String {
        let plugin = join_instance(&self.plugin, self.plugin_instance.as_deref());
        let metric_type = join_instance(
            self.metric_type.as_deref().unwrap_or(DEFAULT_METRIC_TYPE),
            self.type_instance.as_deref(),
        );
        format!("{}/{plugin}/{metric_type}", self.host)
    }
}

impl std::fmt::Display for MetricEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.identifier(), self.value)
    }
}

/// Value type used when a metric carries no explicit type.
pub const DEFAULT_METRIC_TYPE: &str = "gauge";

fn join_instance(name: &str, instance: Option<&str>) -> String {
    match instance {
        Some(inst) if !inst.is_empty() => format!("{name}-{inst}"),
        _ => name.to_string(),
    }
}
