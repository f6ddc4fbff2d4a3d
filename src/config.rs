//! Configuration types for pdns-bootstrap.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::BootstrapError;

/// Top-level configuration.
///
/// Built once at startup from an optional TOML file layered under
/// `PDNS_`-prefixed environment variables (`__` separates nesting levels,
/// e.g. `PDNS_DB__HOST`), then passed by reference into the provisioning
/// sequence. Nothing reads the environment after this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Operational mode of this node.
    pub mode: Mode,

    /// Database backends to provision, in order.
    #[serde(default = "default_backends")]
    pub backends: Vec<Backend>,

    /// Local database connection descriptor.
    #[serde(default)]
    pub db: DbConfig,

    /// Upstream replication descriptor. Required in replica mode.
    #[serde(default)]
    pub replication: Option<ReplicationConfig>,

    /// Filesystem paths (schema, templates, server binary, scratch dir).
    #[serde(default)]
    pub paths: PathsConfig,

    /// External utility program names.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Check cross-field requirements that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.mode == Mode::Replica && self.replication.is_none() {
            return Err(BootstrapError::Config(
                "replica mode requires a [replication] section".into(),
            ));
        }
        if self.backends.is_empty() {
            return Err(BootstrapError::Config(
                "at least one backend must be configured".into(),
            ));
        }
        Ok(())
    }
}

/// Operational mode of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Authoritative source: imports the schema on first boot.
    #[serde(alias = "master")]
    Primary,
    /// Follower: clones from the upstream on first boot, then replicates.
    #[serde(alias = "slave")]
    Replica,
}

/// Supported database backends.
///
/// A closed enum rather than a name-keyed lookup: adding a backend means
/// adding a variant and a match arm, checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MySQL / MariaDB via the gmysql PowerDNS backend.
    Mysql,
}

impl Backend {
    /// Backend name as used in template file names (`backend-<name>.conf.tpl`).
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mysql => "mysql",
        }
    }
}

fn default_backends() -> Vec<Backend> {
    vec![Backend::Mysql]
}

/// Connection descriptor for the local database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database hostname.
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Application user the DNS server connects as.
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Application user password.
    #[serde(default)]
    pub password: String,

    /// Target logical database name.
    #[serde(default = "default_db_database")]
    pub database: String,

    /// Administrative user for database/user creation and restore.
    #[serde(default = "default_root_user")]
    pub root_user: String,

    /// Administrative password.
    #[serde(default)]
    pub root_password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            database: default_db_database(),
            root_user: default_root_user(),
            root_password: String::new(),
        }
    }
}

/// Replication descriptor for the upstream database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Upstream (primary) database hostname.
    pub host: String,

    /// Replication user the replica streams changes as.
    pub user: String,

    /// Replication user password.
    #[serde(default)]
    pub password: String,

    /// Administrative user on the upstream, for grant and dump.
    #[serde(default = "default_root_user")]
    pub root_user: String,

    /// Administrative password on the upstream.
    #[serde(default)]
    pub root_password: String,
}

/// Filesystem paths used during provisioning and handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Schema file imported on first primary boot.
    #[serde(default = "default_schema")]
    pub schema: PathBuf,

    /// Base server configuration template.
    #[serde(default = "default_base_template")]
    pub base_template: PathBuf,

    /// Directory holding per-backend configuration templates.
    #[serde(default = "default_backend_template_dir")]
    pub backend_template_dir: PathBuf,

    /// DNS server binary exec'd after provisioning.
    #[serde(default = "default_server_binary")]
    pub server_binary: PathBuf,

    /// Directory the dump tempfile is created in.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            base_template: default_base_template(),
            backend_template_dir: default_backend_template_dir(),
            server_binary: default_server_binary(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// External utility program names.
///
/// Overridable so deployments with renamed client binaries (and tests) can
/// point at a different executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Logical dump utility.
    #[serde(default = "default_dump_program")]
    pub dump: PathBuf,

    /// Restore utility (dump fed on stdin).
    #[serde(default = "default_restore_program")]
    pub restore: PathBuf,

    /// Template renderer.
    #[serde(default = "default_template_program")]
    pub template: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            dump: default_dump_program(),
            restore: default_restore_program(),
            template: default_template_program(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "pdns_bootstrap=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_db_host() -> String {
    "mysql".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "pdns-auth".to_string()
}

fn default_db_database() -> String {
    "powerdns-auth".to_string()
}

fn default_root_user() -> String {
    "root".to_string()
}

fn default_schema() -> PathBuf {
    PathBuf::from("/usr/share/doc/pdns-backend-mysql/schema.mysql.sql")
}

fn default_base_template() -> PathBuf {
    PathBuf::from("/etc/powerdns/pdns.conf.tpl")
}

fn default_backend_template_dir() -> PathBuf {
    PathBuf::from("/etc/powerdns/pdns.d")
}

fn default_server_binary() -> PathBuf {
    PathBuf::from("/usr/sbin/pdns_server")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_dump_program() -> PathBuf {
    PathBuf::from("mysqldump")
}

fn default_restore_program() -> PathBuf {
    PathBuf::from("mysql")
}

fn default_template_program() -> PathBuf {
    PathBuf::from("envtpl")
}

fn default_log_level() -> String {
    "info".to_string()
}
