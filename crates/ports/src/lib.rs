//! # cloud-log-ports
//!
//! Port traits for the cloud-log hexagonal architecture.
//!
//! This crate defines the interfaces between the logging front end (the
//! encoder driven by the logging library) and the delivery back end (the
//! remote client). It depends only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod client;
pub mod encoder;
pub mod syncer;

pub use client::*;
pub use encoder::*;
pub use syncer::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `cloud-log-domain`.
pub use cloud_log_domain::{
    EntryHeader, Field, FieldSet, FieldValue, LogEntry, LogLevel, MESSAGE_KEY, Severity,
    SourceLocation,
};

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_log_domain::domain_crate_version;
    use cloud_log_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("cloud-log-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn ports_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["cloud-log-domain", "cloud-log-shared"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }

        for expected in allowed {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn ports_crate_compiles() {
        let version = ports_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn ports_can_use_domain_and_shared() {
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }

    #[test]
    fn port_traits_are_object_safe() {
        fn accepts(
            _client: Option<&dyn LogClientPort>,
            _encoder: Option<&dyn EntryEncoder>,
            _syncer: Option<&dyn WriteSyncer>,
        ) {
        }
        accepts(None, None, None);
    }
}
