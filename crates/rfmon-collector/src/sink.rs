use crate::error::EmitError;
use rfmon_common::types::{MetricEvent, DEFAULT_METRIC_TYPE};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for dispatched metrics.
///
/// Sinks are shared by every plugin task, so implementations serialize their
/// own writes.
pub trait MetricSink: Send + Sync {
    /// Returns the sink name (e.g., `"putval"`), used for logging.
    fn name(&self) -> &str;

    /// Hands one metric to the host pipeline.
    ///
    /// # Errors
    ///
    /// Returns an [`EmitError`] if the metric could not be delivered. The
    /// dispatcher logs it and moves on to the next metric.
    fn emit(&self, event: &MetricEvent) -> Result<(), EmitError>;
}

/// Formats a metric as a collectd exec-plugin `PUTVAL` line.
///
/// # Examples
///
/// ```
/// use rfmon_collector::sink::putval_line;
/// use rfmon_common::types::MetricEvent;
/// use std::time::Duration;
///
/// let event = MetricEvent {
///     timestamp: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
///     host: "host1".to_string(),
///     plugin: "redfish".to_string(),
///     plugin_instance: Some("fan".to_string()),
///     metric_type: Some("fanspeed".to_string()),
///     type_instance: Some("Fan1".to_string()),
///     value: 5000.0,
///     interval: Duration::from_secs(60),
/// };
/// assert_eq!(
///     putval_line(&event),
///     "PUTVAL \"host1/redfish-fan/fanspeed-Fan1\" interval=60.000 1700000000:5000"
/// );
/// ```
pub fn putval_line(event: &MetricEvent) -> String {
    format!(
        "PUTVAL \"{}\" interval={:.3} {}:{}",
        putval_identifier(event),
        event.interval.as_secs_f64(),
        event.timestamp.timestamp(),
        event.value
    )
}

/// Identifier safe to place between the quotes of a `PUTVAL` line.
///
/// Control characters and `/` inside a part become `_`, so BMC-supplied names
/// can neither end the line nor shift the identifier fields. `\` and `"` are
/// backslash-escaped as collectd's exec protocol expects.
fn putval_identifier(event: &MetricEvent) -> String {
    let part = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_control() || c == '/' { '_' } else { c })
            .collect()
    };
    let with_instance = |name: &str, instance: Option<&str>| match instance {
        Some(inst) if !inst.is_empty() => format!("{}-{}", part(name), part(inst)),
        _ => part(name),
    };

    let identifier = format!(
        "{}/{}/{}",
        part(&event.host),
        with_instance(&event.plugin, event.plugin_instance.as_deref()),
        with_instance(
            event.metric_type.as_deref().unwrap_or(DEFAULT_METRIC_TYPE),
            event.type_instance.as_deref()
        ),
    );

    let mut escaped = String::with_capacity(identifier.len());
    for c in identifier.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Writes `PUTVAL` lines for a collectd `Exec` plugin to read.
pub struct PutvalSink<W> {
    writer: Mutex<W>,
}

impl<W: Write> PutvalSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PutvalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> MetricSink for PutvalSink<W> {
    fn name(&self) -> &str {
        "putval"
    }

    fn emit(&self, event: &MetricEvent) -> Result<(), EmitError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| EmitError::Rejected("putval writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", putval_line(event))?;
        // collectd reads line by line; don't let values sit in a buffer.
        writer.flush()?;
        Ok(())
    }
}

/// Emits metrics as structured log events.
pub struct LogSink;

impl MetricSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn emit(&self, event: &MetricEvent) -> Result<(), EmitError> {
        tracing::info!(
            metric = %event.identifier(),
            value = event.value,
            timestamp = %event.timestamp.to_rfc3339(),
            "metric"
        );
        Ok(())
    }
}

/// Sink selected by the `Output` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Putval,
    Log,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Putval => write!(f, "putval"),
            SinkKind::Log => write!(f, "log"),
        }
    }
}

impl std::str::FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "putval" => Ok(SinkKind::Putval),
            "log" => Ok(SinkKind::Log),
            _ => Err(format!("unknown output: {s}")),
        }
    }
}

pub fn build_sink(kind: SinkKind) -> Arc<dyn MetricSink> {
    match kind {
        SinkKind::Putval => Arc::new(PutvalSink::stdout()),
        SinkKind::Log => Arc::new(LogSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::event;

    #[test]
    fn putval_sink_writes_one_line_per_metric() {
        let sink = PutvalSink::new(Vec::new());
        sink.emit(&event("Fan1", 5000.0)).unwrap();
        sink.emit(&event("Fan2", 5100.5)).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("PUTVAL \"host1/redfish-fan/fanspeed-Fan1\" interval=60.000 "));
        assert!(lines[1].ends_with(":5100.5"));
    }

    #[test]
    fn putval_line_uses_gauge_for_untyped_metric() {
        let mut e = event("Fan1", 1.0);
        e.metric_type = None;
        e.type_instance = None;
        assert!(putval_line(&e).starts_with("PUTVAL \"host1/redfish-fan/gauge\""));
    }

    #[test]
    fn putval_line_escapes_quotes_and_backslashes() {
        let line = putval_line(&event("PSU \"A\" \\ B", 1.0));
        assert!(line.starts_with(r#"PUTVAL "host1/redfish-fan/fanspeed-PSU \"A\" \\ B" interval="#));
        assert_eq!(line.matches('"').count() - line.matches("\\\"").count(), 2);
    }

    #[test]
    fn putval_line_cannot_be_split_by_sensor_names() {
        let sink = PutvalSink::new(Vec::new());
        sink.emit(&event("Fan\nPUTVAL \"evil/x/gauge\" interval=1 N:1\r", 7.0)).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with(r#"PUTVAL "host1/redfish-fan/fanspeed-Fan_PUTVAL \"evil_x_gauge\" interval=1 N:1_" interval=60.000 "#));
        assert!(out.ends_with(":7\n"));
    }

    #[test]
    fn sink_kind_parses_case_insensitively() {
        assert_eq!("PUTVAL".parse::<SinkKind>(), Ok(SinkKind::Putval));
        assert_eq!("log".parse::<SinkKind>(), Ok(SinkKind::Log));
        assert!("graphite".parse::<SinkKind>().is_err());
        assert_eq!(SinkKind::default().to_string(), "putval");
    }

    #[test]
    fn build_sink_names_match_kind() {
        assert_eq!(build_sink(SinkKind::Log).name(), "log");
        assert_eq!(build_sink(SinkKind::Putval).name(), "putval");
    }
}
