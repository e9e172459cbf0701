//! Remote log client boundary contract.

use cloud_log_domain::LogEntry;
use cloud_log_shared::Result;
use std::sync::Arc;

/// Client of the cloud log-ingestion service.
///
/// Implementations own batching and delivery. One client is shared by every
/// encoder derived from the same root.
pub trait LogClientPort: Send + Sync {
    /// Submit one entry. Buffered clients may return before delivery.
    fn log(&self, entry: LogEntry) -> Result<()>;

    /// Block until every previously submitted entry is delivered.
    ///
    /// Returns the first delivery failure observed since the previous flush.
    fn flush(&self) -> Result<()>;
}

impl<T: LogClientPort + ?Sized> LogClientPort for Arc<T> {
    fn log(&self, entry: LogEntry) -> Result<()> {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}
