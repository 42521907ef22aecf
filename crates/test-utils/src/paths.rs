//! Path utilities for tests.
//!
//! Tests that exercise the shipped YAML need the service's `config/` directory
//! regardless of which crate's working directory `cargo test` runs them from.

use std::path::PathBuf;

/// Returns the workspace root directory.
///
/// Walks up from this crate's manifest directory (`crates/test-utils`).
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Path to `services/{service_name}/config/`, where sample YAML lives.
pub fn service_config_dir(service_name: &str) -> PathBuf {
    workspace_root()
        .join("services")
        .join(service_name)
        .join("config")
}

/// Creates a temporary directory for test output, removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
