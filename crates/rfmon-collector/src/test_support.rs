use crate::error::EmitError;
use crate::sink::MetricSink;
use chrono::Utc;
use rfmon_common::types::MetricEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn event(type_instance: &str, value: f64) -> MetricEvent {
    MetricEvent {
        timestamp: Utc::now(),
        host: "host1".to_string(),
        plugin: "redfish".to_string(),
        plugin_instance: Some("fan".to_string()),
        metric_type: Some("fanspeed".to_string()),
        type_instance: Some(type_instance.to_string()),
        value,
        interval: Duration::from_secs(60),
    }
}

/// Records every emitted metric; rejects metrics whose type instance is in
/// `reject`.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<MetricEvent>>,
    pub reject: Vec<String>,
}

impl RecordingSink {
    pub fn rejecting(names: &[&str]) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn emit(&self, event: &MetricEvent) -> Result<(), EmitError> {
        if let Some(ti) = &event.type_instance {
            if self.reject.contains(ti) {
                return Err(EmitError::Rejected(ti.clone()));
            }
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// In-memory log destination for asserting on emitted tracing events.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Routes this thread's events at INFO and above into the capture until
    /// the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buf.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines().into_iter().filter(|l| l.contains(" ERROR ")).collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
