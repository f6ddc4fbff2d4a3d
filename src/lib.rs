//! pdns-bootstrap - container entrypoint for a MySQL-backed PowerDNS authority.
//!
//! This crate provisions the database a PowerDNS authoritative server needs
//! before replacing itself with the server binary. On a primary it imports
//! the schema into an empty database; on a replica it clones the upstream
//! instance (dump and restore) and starts continuous replication.
//!
//! ## Startup sequence
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       pdns-bootstrap                         │
//! │                                                              │
//! │  load Config (TOML file + PDNS__* environment)               │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  render base template                                        │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  per backend: provision ──▶ render backend template          │
//! │        │                                                     │
//! │        │   primary + empty db: import schema file            │
//! │        │   replica + empty db: grant ▶ dump ▶ restore        │
//! │        │                      ▶ CHANGE MASTER ▶ START SLAVE  │
//! │        ▼                                                     │
//! │  exec /usr/sbin/pdns_server   (process replaced)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step is sequential and fail-fast: a half-provisioned node must
//! never reach the handoff. The only retries anywhere are bounded retries
//! around database connection establishment.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod provision;
pub mod replica;
pub mod telemetry;
pub mod tool;

// Re-export main types
pub use config::{
    Backend, Config, DbConfig, Mode, PathsConfig, ReplicationConfig, TelemetryConfig, ToolsConfig,
};
pub use error::BootstrapError;
pub use tool::ToolKind;
