//! Paths to the shared fixture files under `crates/testkit/fixtures`.

use std::path::{Path, PathBuf};

/// Directory holding config and env fixtures.
pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Absolute path of a fixture, relative to [`fixtures_root`].
pub fn fixture_path(relative: &str) -> PathBuf {
    fixtures_root().join(relative)
}

/// Read a fixture as UTF-8.
pub fn read_fixture(relative: &str) -> std::io::Result<String> {
    std::fs::read_to_string(fixture_path(relative))
}
