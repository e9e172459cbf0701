//! Background batching worker.
//!
//! One thread owns a current-thread tokio runtime and drains the command
//! channel. Entries accumulate until the batch is full or the flush interval
//! elapses, then go out in a single `entries:write` request.

use super::transport::Transport;
use cloud_log_domain::LogEntry;
use cloud_log_shared::{ErrorEnvelope, Result};
use std::cell::Cell;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

thread_local! {
    static DELIVERY_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread belongs to a client's delivery machinery.
///
/// Events emitted here (the client's own diagnostics, its HTTP stack) must
/// not be logged back through the client: a synchronous submission from the
/// worker would wait on itself.
pub fn is_delivery_thread() -> bool {
    DELIVERY_THREAD.with(Cell::get)
}

pub(super) fn mark_delivery_thread() {
    DELIVERY_THREAD.with(|flag| flag.set(true));
}

pub(super) type Reply = SyncSender<Result<()>>;

pub(super) enum Command {
    /// Buffered entry; failures surface on the next flush.
    Entry(LogEntry),
    /// Entry whose submitter waits for the write result.
    EntrySync(LogEntry, Reply),
    /// Write everything queued so far and report failures since the last flush.
    Flush(Reply),
    /// Dry-run write.
    Ping(Reply),
    /// Write what is left and stop.
    Shutdown,
}

pub(super) struct Worker {
    transport: Transport,
    runtime: Runtime,
    max_entries: usize,
    flush_interval: Duration,
    batch: Vec<LogEntry>,
    buffered_in_batch: usize,
    waiters: Vec<Reply>,
    deadline: Option<Instant>,
    pending_error: Option<ErrorEnvelope>,
    failed_batches: u64,
}

impl Worker {
    pub(super) fn new(
        transport: Transport,
        runtime: Runtime,
        max_entries: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            transport,
            runtime,
            max_entries: max_entries.max(1),
            flush_interval,
            batch: Vec::with_capacity(max_entries.max(1)),
            buffered_in_batch: 0,
            waiters: Vec::new(),
            deadline: None,
            pending_error: None,
            failed_batches: 0,
        }
    }

    pub(super) fn run(mut self, commands: &Receiver<Command>) {
        mark_delivery_thread();
        tracing::debug!(target: "cloud_log::worker", "worker started");
        loop {
            let command = match self.deadline {
                None => match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
                Some(deadline) => {
                    match commands.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            self.write_batch();
                            continue;
                        },
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                },
            };

            match command {
                Command::Entry(entry) => self.push(entry, None),
                Command::EntrySync(entry, reply) => self.push(entry, Some(reply)),
                Command::Flush(reply) => {
                    self.write_batch();
                    send_reply(&reply, self.take_flush_result());
                },
                Command::Ping(reply) => {
                    let result = self.runtime.block_on(self.transport.ping());
                    send_reply(&reply, result);
                },
                Command::Shutdown => break,
            }
        }

        self.write_batch();
        if let Err(error) = self.take_flush_result() {
            tracing::warn!(
                target: "cloud_log::worker",
                code = %error.code,
                error = %error.message,
                "entries lost at shutdown"
            );
        }
        tracing::debug!(target: "cloud_log::worker", "worker stopped");
    }

    fn push(&mut self, entry: LogEntry, waiter: Option<Reply>) {
        if self.batch.is_empty() {
            self.deadline = Some(Instant::now() + self.flush_interval);
        }
        self.batch.push(entry);
        match waiter {
            Some(reply) => self.waiters.push(reply),
            None => self.buffered_in_batch += 1,
        }

        // Synchronous submitters are waiting, so their batch goes out now.
        if self.batch.len() >= self.max_entries || !self.waiters.is_empty() {
            self.write_batch();
        }
    }

    fn write_batch(&mut self) {
        self.deadline = None;
        if self.batch.is_empty() {
            return;
        }

        let entries = std::mem::take(&mut self.batch);
        let waiters = std::mem::take(&mut self.waiters);
        let buffered = std::mem::take(&mut self.buffered_in_batch);
        let count = entries.len();

        let result = self.runtime.block_on(self.transport.write_entries(entries));
        match &result {
            Ok(()) => {
                tracing::debug!(target: "cloud_log::worker", entries = count, "batch written");
            },
            Err(error) => {
                self.failed_batches += 1;
                tracing::warn!(
                    target: "cloud_log::worker",
                    entries = count,
                    code = %error.code,
                    error = %error.message,
                    "batch write failed"
                );
                if buffered > 0 && self.pending_error.is_none() {
                    self.pending_error = Some(error.clone());
                }
            },
        }

        for reply in &waiters {
            send_reply(reply, result.clone());
        }
    }

    fn take_flush_result(&mut self) -> Result<()> {
        let failed_batches = std::mem::take(&mut self.failed_batches);
        match self.pending_error.take() {
            None => Ok(()),
            Some(error) => {
                Err(error.with_metadata("failed_batches", failed_batches.to_string()))
            },
        }
    }
}

fn send_reply(reply: &Reply, result: Result<()>) {
    // The submitter may have timed out and dropped its receiver.
    if reply.try_send(result).is_err() {
        tracing::debug!(target: "cloud_log::worker", "reply receiver gone");
    }
}
