//! Composition root: client, layer and flush guard from a validated config.

use crate::layer::CloudLoggingLayer;
use cloud_log_adapters::{
    CloudEncoder, CloudLoggingClient, CloudLoggingClientOptions, CloudWriteSyncer, LogSink,
    StderrLogSink,
};
use cloud_log_config::{CloudLogEnv, ValidatedCloudLogConfig};
use cloud_log_ports::{LogClientPort, WriteSyncer};
use cloud_log_shared::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Everything needed to ship `tracing` events to Cloud Logging.
pub struct CloudLogging {
    /// Layer to add to a subscriber.
    pub layer: CloudLoggingLayer,
    /// Flushes the client when dropped.
    pub guard: FlushGuard,
}

impl fmt::Debug for CloudLogging {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CloudLogging")
            .field("layer", &self.layer)
            .field("guard", &self.guard)
            .finish()
    }
}

/// Flushes pending entries on drop.
///
/// Keep it alive for as long as events should be delivered, typically in
/// `main`.
#[must_use = "dropping the guard flushes and stops waiting for pending entries"]
pub struct FlushGuard {
    syncer: Arc<dyn WriteSyncer>,
    errors: Arc<dyn LogSink>,
}

impl FlushGuard {
    /// Guard syncing `syncer`; failures on drop go to `errors`.
    pub fn new(syncer: Arc<dyn WriteSyncer>, errors: Arc<dyn LogSink>) -> Self {
        Self { syncer, errors }
    }

    /// Block until everything logged so far has been delivered.
    pub fn flush(&self) -> Result<()> {
        self.syncer.sync()
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if let Err(error) = self.syncer.sync() {
            self.errors.report("cloud_log.flush_failed", &error);
        }
    }
}

impl fmt::Debug for FlushGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("FlushGuard").finish_non_exhaustive()
    }
}

/// Connect a [`CloudLoggingClient`] and wrap it in a layer and guard.
pub fn build_cloud_logging(
    config: &ValidatedCloudLogConfig,
    env: &CloudLogEnv,
) -> Result<CloudLogging> {
    let options = CloudLoggingClientOptions::from_config(config, env.access_token.clone());
    let client = CloudLoggingClient::connect(options)?;
    tracing::debug!(
        target: "cloud_log::bootstrap",
        log_name = client.log_name(),
        "cloud logging ready"
    );
    Ok(build_with_client(config, Arc::new(client)))
}

/// Wrap an existing client in a layer and guard.
pub fn build_with_client(
    config: &ValidatedCloudLogConfig,
    client: Arc<dyn LogClientPort>,
) -> CloudLogging {
    let errors: Arc<dyn LogSink> = Arc::new(StderrLogSink);
    let syncer: Arc<dyn WriteSyncer> = Arc::new(CloudWriteSyncer::new(Arc::clone(&client)));
    let layer = CloudLoggingLayer::from_config(
        &config.layer,
        CloudEncoder::new(client),
        Arc::clone(&syncer),
    )
    .with_error_sink(Arc::clone(&errors));

    CloudLogging {
        layer,
        guard: FlushGuard::new(syncer, errors),
    }
}

/// Parse the `diagnostics.filter` directive.
pub fn env_filter(config: &ValidatedCloudLogConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.diagnostics.filter).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_filter"),
            format!("invalid diagnostics filter: {error}"),
        )
        .with_metadata("filter", config.diagnostics.filter.clone())
    })
}

/// Install the global subscriber: filter, Cloud Logging layer and, when
/// `diagnostics.stderrJson` is set, a JSON `fmt` layer on stderr.
pub fn init_global(config: &ValidatedCloudLogConfig, env: &CloudLogEnv) -> Result<FlushGuard> {
    let filter = env_filter(config)?;
    let CloudLogging { layer, guard } = build_cloud_logging(config, env)?;
    let stderr = config
        .diagnostics
        .stderr_json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .with(stderr)
        .try_init()
        .map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("cloud_log", "already_initialized"),
                format!("global subscriber already set: {error}"),
            )
        })?;
    Ok(guard)
}
