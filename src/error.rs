//! Error types for pdns-bootstrap.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::tool::ToolKind;

/// Errors that can occur during provisioning and server handoff.
///
/// Every failure aborts the startup sequence: a half-provisioned node must
/// never reach the server handoff. The only retries anywhere are bounded
/// retries around connection establishment.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// IO error (schema file, tempfile, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database connection or statement error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// External utility could not be launched
    #[error("failed to launch {tool} tool {program:?}: {source}")]
    ToolSpawn {
        /// Which utility failed to start.
        tool: ToolKind,
        /// The program that was invoked.
        program: PathBuf,
        /// The underlying spawn error.
        source: std::io::Error,
    },

    /// External utility ran but exited non-zero
    #[error("{tool} tool exited with {status}")]
    ToolFailed {
        /// Which utility failed.
        tool: ToolKind,
        /// Its exit status.
        status: ExitStatus,
    },

    /// Replacing this process with the server binary failed
    #[error("failed to exec {path:?}: {source}")]
    Exec {
        /// The server binary path.
        path: PathBuf,
        /// The underlying exec error.
        source: std::io::Error,
    },
}
