//! In-memory client implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of encoders, syncers and layers
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without network access

use cloud_log_domain::LogEntry;
use cloud_log_ports::LogClientPort;
use cloud_log_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RecordingState {
    entries: Vec<LogEntry>,
    flushes: usize,
    log_failures: VecDeque<ErrorEnvelope>,
    flush_failures: VecDeque<ErrorEnvelope>,
}

/// Client that records submitted entries instead of sending them.
///
/// Failures can be scripted with [`RecordingLogClient::fail_next_log`] and
/// [`RecordingLogClient::fail_next_flush`]; each scripted failure is consumed
/// by one call.
#[derive(Debug, Default)]
pub struct RecordingLogClient {
    state: Mutex<RecordingState>,
}

impl RecordingLogClient {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries submitted so far, in submission order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().map(|state| state.entries.clone()).unwrap_or_default()
    }

    /// Remove and return the recorded entries.
    pub fn take_entries(&self) -> Vec<LogEntry> {
        self.lock()
            .map(|mut state| std::mem::take(&mut state.entries))
            .unwrap_or_default()
    }

    /// Number of flush calls, successful or not.
    pub fn flush_count(&self) -> usize {
        self.lock().map(|state| state.flushes).unwrap_or_default()
    }

    /// Make the next `log` call fail with `error`.
    pub fn fail_next_log(&self, error: ErrorEnvelope) {
        if let Ok(mut state) = self.lock() {
            state.log_failures.push_back(error);
        }
    }

    /// Make the next `flush` call fail with `error`.
    pub fn fail_next_flush(&self, error: ErrorEnvelope) {
        if let Ok(mut state) = self.lock() {
            state.flush_failures.push_back(error);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordingState>> {
        self.state.lock().map_err(|_| {
            ErrorEnvelope::invariant(
                ErrorCode::new("testkit", "poisoned"),
                "recording client lock poisoned",
            )
        })
    }
}

impl LogClientPort for RecordingLogClient {
    fn log(&self, entry: LogEntry) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(error) = state.log_failures.pop_front() {
            return Err(error);
        }
        state.entries.push(entry);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.flushes += 1;
        state.flush_failures.pop_front().map_or(Ok(()), Err)
    }
}

/// Client that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogClient;

impl LogClientPort for NoopLogClient {
    fn log(&self, _entry: LogEntry) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{delivery_error, timeout_error};
    use cloud_log_domain::{EntryHeader, FieldSet, LogLevel};

    fn entry(message: &str) -> LogEntry {
        LogEntry::from_header(EntryHeader::new(LogLevel::Info, message), FieldSet::new())
    }

    #[test]
    fn records_entries_in_order() -> Result<()> {
        let client = RecordingLogClient::new();
        client.log(entry("first"))?;
        client.log(entry("second"))?;

        let messages: Vec<String> = client
            .entries()
            .iter()
            .filter_map(|entry| entry.message().map(str::to_owned))
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(client.take_entries().len(), 2);
        assert!(client.entries().is_empty());
        Ok(())
    }

    #[test]
    fn scripted_failures_are_consumed_once() -> Result<()> {
        let client = RecordingLogClient::new();
        client.fail_next_log(delivery_error());
        client.fail_next_flush(timeout_error());

        assert!(client.log(entry("dropped")).is_err());
        client.log(entry("kept"))?;
        assert!(client.flush().is_err());
        client.flush()?;

        assert_eq!(client.entries().len(), 1);
        assert_eq!(client.flush_count(), 2);
        Ok(())
    }
}
