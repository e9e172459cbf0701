//! # cloud-log-config
//!
//! Configuration schema, validation, and normalization for the Cloud Logging
//! backend. This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    BatchConfig, CURRENT_CONFIG_VERSION, ClientConfig, CloudLogConfig, ConfigSchemaError,
    DEFAULT_BASE_URL, DEFAULT_RESOURCE_TYPE, DeliveryMode, DiagnosticsConfig, LayerConfig,
    ResourceConfig, ValidatedCloudLogConfig, default_ignored_targets, parse_cloud_log_config_json,
    parse_cloud_log_config_toml,
};

pub use env::{CloudLogEnv, EnvParseError, apply_env_overrides};
pub use load::{
    load_cloud_log_config_from_path, load_cloud_log_config_from_sources,
    load_cloud_log_config_std_env, to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_log_domain::domain_crate_version;
    use cloud_log_shared::shared_crate_version;

    #[test]
    fn config_crate_compiles() {
        let version = config_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn config_can_use_domain_and_shared() {
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
