//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use rmf::prelude::*;
use tempfile::TempDir;

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh directory and a path inside it.
pub fn temp_path(file_name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(file_name);
    (dir, path)
}

/// Names of the children of `node`.
pub fn child_names(data: &mut SharedData, node: NodeId) -> Vec<String> {
    data.get_children(node)
        .expect("Failed to list children")
        .into_iter()
        .map(|c| data.get_name(c).expect("Failed to read name"))
        .collect()
}

/// Child of `node` named `name`.
pub fn child_by_name(data: &mut SharedData, node: NodeId, name: &str) -> Option<NodeId> {
    data.get_children(node)
        .expect("Failed to list children")
        .into_iter()
        .find(|&c| data.get_name(c).map(|n| n == name).unwrap_or(false))
}
