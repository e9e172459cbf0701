//! Write syncer whose only job is forwarding flushes to the remote client.

use cloud_log_ports::{LogClientPort, WriteSyncer};
use cloud_log_shared::{Result, into_io_error};
use std::fmt;
use std::io;
use std::sync::Arc;

/// Discards written bytes and turns `sync` into a client flush.
///
/// Entries leave the process through [`crate::CloudEncoder`], so whatever a
/// writer hands over here is already delivered or queued.
#[derive(Clone)]
pub struct CloudWriteSyncer {
    client: Arc<dyn LogClientPort>,
}

impl CloudWriteSyncer {
    /// Syncer flushing `client`.
    pub fn new(client: Arc<dyn LogClientPort>) -> Self {
        Self { client }
    }
}

impl fmt::Debug for CloudWriteSyncer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CloudWriteSyncer").finish_non_exhaustive()
    }
}

impl WriteSyncer for CloudWriteSyncer {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        Ok(bytes.len())
    }

    fn sync(&self) -> Result<()> {
        self.client.flush()
    }
}

impl io::Write for CloudWriteSyncer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync().map_err(into_io_error)
    }
}
