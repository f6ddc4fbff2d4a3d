//! Shared test infrastructure for the bootstrap pipeline tests.
//!
//! The dump and restore utilities are exercised through fake shell scripts
//! so the pipeline's sequencing and cleanup can be observed without a
//! running MySQL instance.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use pdns_bootstrap::{DbConfig, ReplicationConfig, ToolsConfig};

/// Write an executable shell script into `dir` and return its path.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Local database descriptor pointing at a host no test ever connects to.
pub fn test_db() -> DbConfig {
    DbConfig {
        host: "replica.db.internal".to_string(),
        root_user: "local-admin".to_string(),
        root_password: "local-secret".to_string(),
        ..DbConfig::default()
    }
}

/// Upstream replication descriptor.
pub fn test_repl() -> ReplicationConfig {
    ReplicationConfig {
        host: "primary.db.internal".to_string(),
        user: "repl".to_string(),
        password: "repl-secret".to_string(),
        root_user: "upstream-admin".to_string(),
        root_password: "upstream-secret".to_string(),
    }
}

/// Tools config with fake dump/restore executables.
pub fn test_tools(dump: PathBuf, restore: PathBuf) -> ToolsConfig {
    ToolsConfig {
        dump,
        restore,
        ..ToolsConfig::default()
    }
}

/// Number of entries left in the scratch directory.
pub fn scratch_entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}
