use std::time::Duration;

pub const DEFAULT_PREFIX: &str = "redfish";
pub const DEFAULT_INTERVAL_SECS: f64 = 60.0;

/// Immutable settings for one plugin instance, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettings {
    /// Metric namespace, emitted as the plugin name.
    pub prefix: String,
    /// Host label attached to every emitted metric.
    pub hostname: String,
    pub interval: Duration,
    /// Log cycle timings at info level.
    pub verbose: bool,
    /// Log every dispatched value at info level.
    pub debug: bool,
}

impl PluginSettings {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            hostname: hostname.into(),
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            verbose: false,
            debug: false,
        }
    }
}
