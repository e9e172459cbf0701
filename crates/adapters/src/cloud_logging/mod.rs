//! Google Cloud Logging client.
//!
//! Entries are written through the v2 REST API
//! (`POST {base}/entries:write`). Delivery happens on a dedicated worker
//! thread so `log` never waits on the network in buffered mode.

mod transport;
mod wire;
mod worker;

pub use wire::MonitoredResource;
pub use worker::is_delivery_thread;

use cloud_log_config::{DeliveryMode, ValidatedCloudLogConfig};
use cloud_log_domain::LogEntry;
use cloud_log_ports::LogClientPort;
use cloud_log_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use transport::{Transport, TransportSettings};
use worker::{Command, Worker};

/// Settings for [`CloudLoggingClient::connect`].
#[derive(Debug, Clone)]
pub struct CloudLoggingClientOptions {
    /// Destination project.
    pub project_id: Box<str>,
    /// Destination log within the project.
    pub log_id: Box<str>,
    /// API base URL, e.g. `https://logging.googleapis.com/v2`.
    pub base_url: Box<str>,
    /// Dial timeout, fixed for the client's lifetime.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// OAuth2 bearer token. Requests are unauthenticated without one.
    pub access_token: Option<SecretString>,
    /// Resource attached to every entry.
    pub resource: MonitoredResource,
    /// Labels attached to every entry.
    pub labels: BTreeMap<String, String>,
    /// Entries per request.
    pub max_entries: usize,
    /// Longest time an entry waits for its batch.
    pub flush_interval: Duration,
    /// Entries queued before `log` reports a full buffer.
    pub buffer_capacity: usize,
    /// Longest time `flush` blocks.
    pub flush_timeout: Duration,
    /// Buffered or synchronous delivery.
    pub delivery: DeliveryMode,
    /// Run a dry-run write during `connect`.
    pub ping_on_connect: bool,
}

impl CloudLoggingClientOptions {
    /// Build from a validated config plus the access token from the environment.
    #[must_use]
    pub fn from_config(config: &ValidatedCloudLogConfig, access_token: Option<SecretString>) -> Self {
        let client = &config.client;
        let batch = &config.batch;
        Self {
            project_id: config.project_id().into(),
            log_id: config.log_id().into(),
            base_url: client.base_url.as_str().into(),
            connect_timeout: client.connect_timeout(),
            request_timeout: client.request_timeout(),
            access_token,
            resource: MonitoredResource {
                resource_type: client.resource.resource_type.clone(),
                labels: client.resource.labels.clone(),
            },
            labels: client.labels.clone(),
            max_entries: usize::try_from(batch.max_entries).unwrap_or(usize::MAX),
            flush_interval: batch.flush_interval(),
            buffer_capacity: usize::try_from(batch.buffer_capacity).unwrap_or(usize::MAX),
            flush_timeout: batch.flush_timeout(),
            delivery: client.delivery,
            ping_on_connect: client.ping_on_connect,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(invalid_option("project id must be non-empty"));
        }
        if self.log_id.trim().is_empty() {
            return Err(invalid_option("log id must be non-empty"));
        }
        if self.max_entries == 0 {
            return Err(invalid_option("max entries must be greater than zero"));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid_option("buffer capacity must be greater than zero"));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(invalid_option("timeouts must be greater than zero"));
        }
        Ok(())
    }
}

/// [`LogClientPort`] backed by Cloud Logging.
///
/// Dropping the client writes whatever is still queued and joins the worker.
pub struct CloudLoggingClient {
    commands: SyncSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    delivery: DeliveryMode,
    flush_timeout: Duration,
    log_name: Box<str>,
}

impl CloudLoggingClient {
    /// Start the worker and, when configured, verify the destination with a
    /// dry-run write.
    pub fn connect(options: CloudLoggingClientOptions) -> Result<Self> {
        options.validate()?;

        let log_name = wire::log_name(&options.project_id, &options.log_id);
        let transport = Transport::new(TransportSettings {
            base_url: &options.base_url,
            log_name: log_name.clone(),
            resource: options.resource.clone(),
            labels: options.labels.clone(),
            connect_timeout: options.connect_timeout,
            request_timeout: options.request_timeout,
            access_token: options.access_token.as_ref(),
        })?;
        // Blocking-pool threads (DNS lookups) deliver too.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .on_thread_start(worker::mark_delivery_thread)
            .build()
            .map_err(ErrorEnvelope::from)?;

        let (commands, receiver) = mpsc::sync_channel(options.buffer_capacity);
        let worker = Worker::new(
            transport,
            runtime,
            options.max_entries,
            options.flush_interval,
        );
        let handle = std::thread::Builder::new()
            .name("cloud-log-worker".to_owned())
            .spawn(move || worker.run(&receiver))
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("client", "init_failed"),
                    format!("failed to spawn Cloud Logging worker: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        let client = Self {
            commands,
            worker: Mutex::new(Some(handle)),
            delivery: options.delivery,
            flush_timeout: options.flush_timeout,
            log_name: log_name.into_boxed_str(),
        };
        tracing::debug!(
            target: "cloud_log::client",
            log_name = %client.log_name,
            delivery = ?client.delivery,
            "cloud logging client started"
        );

        if options.ping_on_connect {
            client.ping()?;
        }
        Ok(client)
    }

    /// Full resource name of the destination log.
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Send a dry-run write; nothing is stored.
    pub fn ping(&self) -> Result<()> {
        let (reply, response) = mpsc::sync_channel(1);
        self.commands
            .send(Command::Ping(reply))
            .map_err(|_| closed_error())?;
        self.wait(&response, "ping")
    }

    /// Flush, stop the worker and wait for it to exit.
    pub fn close(&self) -> Result<()> {
        let flushed = self.flush();
        self.shutdown()?;
        flushed
    }

    fn shutdown(&self) -> Result<()> {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        // A closed channel means the worker already exited.
        if self.commands.send(Command::Shutdown).is_err() {
            tracing::debug!(target: "cloud_log::client", "worker already gone");
        }
        handle.join().map_err(|_| {
            ErrorEnvelope::invariant(
                ErrorCode::new("client", "worker_panicked"),
                "Cloud Logging worker panicked",
            )
        })
    }

    fn wait(&self, response: &Receiver<Result<()>>, operation: &'static str) -> Result<()> {
        match response.recv_timeout(self.flush_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ErrorEnvelope::unexpected(
                ErrorCode::timeout(),
                format!("{operation} did not complete within {:?}", self.flush_timeout),
                ErrorClass::Retriable,
            )
            .with_metadata("operation", operation)),
            Err(RecvTimeoutError::Disconnected) => Err(closed_error()),
        }
    }
}

impl LogClientPort for CloudLoggingClient {
    fn log(&self, entry: LogEntry) -> Result<()> {
        match self.delivery {
            DeliveryMode::Buffered => {
                self.commands
                    .try_send(Command::Entry(entry))
                    .map_err(|error| match error {
                        TrySendError::Full(_) => ErrorEnvelope::expected_with_class(
                            ErrorCode::new("client", "buffer_full"),
                            "Cloud Logging buffer is full; entry dropped",
                            ErrorClass::Retriable,
                        ),
                        TrySendError::Disconnected(_) => closed_error(),
                    })
            },
            DeliveryMode::Synchronous => {
                let (reply, response) = mpsc::sync_channel(1);
                self.commands
                    .send(Command::EntrySync(entry, reply))
                    .map_err(|_| closed_error())?;
                self.wait(&response, "log")
            },
        }
    }

    fn flush(&self) -> Result<()> {
        let (reply, response) = mpsc::sync_channel(1);
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| closed_error())?;
        self.wait(&response, "flush")
    }
}

impl Drop for CloudLoggingClient {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            tracing::warn!(
                target: "cloud_log::client",
                code = %error.code,
                "cloud logging worker did not stop cleanly"
            );
        }
    }
}

impl fmt::Debug for CloudLoggingClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CloudLoggingClient")
            .field("log_name", &self.log_name)
            .field("delivery", &self.delivery)
            .field("flush_timeout", &self.flush_timeout)
            .finish_non_exhaustive()
    }
}

fn closed_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("client", "closed"),
        "Cloud Logging client is closed",
    )
}

fn invalid_option(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_log_config::{CloudLogConfig, CloudLogEnv, apply_env_overrides};

    fn options() -> CloudLoggingClientOptions {
        CloudLoggingClientOptions {
            project_id: "demo".into(),
            log_id: "app".into(),
            base_url: "http://127.0.0.1:9/v2".into(),
            connect_timeout: Duration::from_millis(100),
            request_timeout: Duration::from_secs(1),
            access_token: None,
            resource: MonitoredResource {
                resource_type: "global".to_owned(),
                labels: BTreeMap::new(),
            },
            labels: BTreeMap::new(),
            max_entries: 10,
            flush_interval: Duration::from_secs(60),
            buffer_capacity: 4,
            flush_timeout: Duration::from_secs(5),
            delivery: DeliveryMode::Buffered,
            ping_on_connect: false,
        }
    }

    #[test]
    fn options_follow_validated_config() -> Result<()> {
        let mut config = CloudLogConfig::default();
        config.client.project_id = Some("demo-project".to_owned());
        config.client.log_id = Some("checkout/api".to_owned());
        config.batch.max_entries = 25;
        let config = apply_env_overrides(config, &CloudLogEnv::default())?;

        let options = CloudLoggingClientOptions::from_config(&config, Some(SecretString::new("t")));
        assert_eq!(options.project_id.as_ref(), "demo-project");
        assert_eq!(options.max_entries, 25);
        assert_eq!(options.resource.resource_type, "global");
        assert_eq!(options.flush_timeout, Duration::from_secs(30));
        assert!(options.access_token.is_some());
        Ok(())
    }

    #[test]
    fn invalid_options_are_rejected_before_starting() {
        let mut bad = options();
        bad.log_id = "  ".into();
        let error = CloudLoggingClient::connect(bad).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));

        let mut bad = options();
        bad.buffer_capacity = 0;
        assert!(CloudLoggingClient::connect(bad).is_err());
    }

    #[test]
    fn log_name_is_escaped() -> Result<()> {
        let mut options = options();
        options.log_id = "checkout/api".into();
        let client = CloudLoggingClient::connect(options)?;
        assert_eq!(client.log_name(), "projects/demo/logs/checkout%2Fapi");
        client.close()
    }

    #[test]
    fn closed_client_rejects_entries() -> Result<()> {
        let client = CloudLoggingClient::connect(options())?;
        client.close()?;

        let entry = LogEntry::from_header(
            cloud_log_domain::EntryHeader::new(cloud_log_domain::LogLevel::Info, "late"),
            cloud_log_domain::FieldSet::new(),
        );
        let error = client.log(entry).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("client", "closed"))
        );
        Ok(())
    }
}
