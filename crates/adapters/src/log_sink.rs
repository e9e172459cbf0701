//! Sinks for failures that cannot be reported through `tracing` itself.

use cloud_log_shared::ErrorEnvelope;
use serde_json::json;
use std::io::Write;

/// A sink that receives pre-formatted diagnostic lines.
pub trait LogSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);

    /// Report a failure as one JSON line.
    fn report(&self, event: &str, error: &ErrorEnvelope) {
        let line = json!({
            "event": event,
            "code": error.code.to_string(),
            "class": error.class,
            "message": error.message,
            "metadata": error.metadata,
        });
        self.write_line(&format!("{line}\n"));
    }
}

/// Log sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}
