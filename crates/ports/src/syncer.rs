//! Byte sink boundary contract.

use cloud_log_shared::Result;

/// Flush-capable sink for encoded bytes.
pub trait WriteSyncer: Send + Sync {
    /// Accept `bytes`, returning how many were consumed.
    fn write(&self, bytes: &[u8]) -> Result<usize>;

    /// Block until buffered output reaches its destination.
    fn sync(&self) -> Result<()>;
}
