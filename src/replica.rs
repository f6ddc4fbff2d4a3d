//! Replica bootstrap: clone the upstream database and start replication.
//!
//! Runs only when the local database reports zero tables (first boot of the
//! instance). The sequence is strictly sequential and fail-fast: any step
//! that does not succeed aborts the whole startup, so a node with a partial
//! or absent dataset never reaches the server handoff. The sequence is not
//! re-entrant; the zero-tables gate at the caller keeps it to at most one
//! run per container lifetime.

use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, Executor};
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{DbConfig, ReplicationConfig, ToolsConfig};
use crate::error::BootstrapError;
use crate::provision::connect_with_retry;
use crate::tool::{self, ToolKind};

/// MASTER_CONNECT_RETRY interval handed to the upstream, in seconds.
const CONNECT_RETRY_SECS: u32 = 10;

/// Replication streams over the standard MySQL port.
const REPLICATION_PORT: u16 = 3306;

// GRANT and CHANGE MASTER cannot take bound parameters; the interpolated
// values come from deploy configuration, not from untrusted input.

pub(crate) fn grant_replication_sql(repl: &ReplicationConfig) -> String {
    format!(
        "GRANT REPLICATION SLAVE ON *.* TO '{}'@'%' IDENTIFIED BY '{}'",
        repl.user, repl.password
    )
}

pub(crate) fn change_source_sql(repl: &ReplicationConfig) -> String {
    format!(
        "CHANGE MASTER TO \
         MASTER_HOST='{}', \
         MASTER_USER='{}', \
         MASTER_PASSWORD='{}', \
         MASTER_PORT={}, \
         MASTER_CONNECT_RETRY={}",
        repl.host, repl.user, repl.password, REPLICATION_PORT, CONNECT_RETRY_SECS
    )
}

/// Make this freshly started replica structurally and data-identical to its
/// upstream, then place it into continuous replication.
///
/// Steps, each blocking on the previous:
/// 1. connect to the upstream as its administrative user
/// 2. grant the replication privilege and flush privilege caches
/// 3. dump the upstream instance to a scoped tempfile
/// 4. restore the dump into the local database
/// 5. point replication at the upstream and start it
pub async fn bootstrap(
    db: &DbConfig,
    repl: &ReplicationConfig,
    tools: &ToolsConfig,
    scratch_dir: &Path,
) -> Result<(), BootstrapError> {
    info!(upstream = %repl.host, user = %repl.user, "bootstrapping replica from upstream");

    let opts = MySqlConnectOptions::new()
        .host(&repl.host)
        .port(REPLICATION_PORT)
        .username(&repl.root_user)
        .password(&repl.root_password);
    let mut upstream = connect_with_retry(&opts).await?;

    // The grant must be visible before the replica first authenticates.
    upstream
        .execute(grant_replication_sql(repl).as_str())
        .await?;
    upstream.execute("FLUSH PRIVILEGES").await?;

    clone_upstream(db, repl, tools, scratch_dir).await?;

    debug!(upstream = %repl.host, "configuring replication source");
    upstream.execute(change_source_sql(repl).as_str()).await?;
    upstream.execute("START SLAVE").await?;

    upstream.close().await?;
    info!("replica bootstrap complete");
    Ok(())
}

/// Dump the whole upstream instance and restore it into the local database.
///
/// The dump lands in a tempfile created with restrictive permissions inside
/// `scratch_dir`; the file is deleted when the handle drops, on success and
/// on every failure path alike. A failed dump never reaches the restore
/// step, so a partial or absent dump is never applied.
pub async fn clone_upstream(
    db: &DbConfig,
    repl: &ReplicationConfig,
    tools: &ToolsConfig,
    scratch_dir: &Path,
) -> Result<(), BootstrapError> {
    let dump_file = NamedTempFile::new_in(scratch_dir)?;

    info!(upstream = %repl.host, "dumping upstream instance");
    let mut dump_cmd = Command::new(&tools.dump);
    dump_cmd
        .arg("--single-transaction")
        .arg("--master-data")
        .arg("--all-databases")
        .arg("-h")
        .arg(&repl.host)
        .arg("-u")
        .arg(&repl.root_user)
        .arg(format!("--password={}", repl.root_password))
        .stdout(Stdio::from(dump_file.reopen()?));
    tool::run(ToolKind::Dump, &mut dump_cmd).await?;

    let dump_bytes = dump_file.as_file().metadata()?.len();
    info!(bytes = dump_bytes, "restoring dump into local database");

    let mut restore_cmd = Command::new(&tools.restore);
    restore_cmd
        .arg("-h")
        .arg(&db.host)
        .arg("-u")
        .arg(&db.root_user)
        .arg(format!("--password={}", db.root_password))
        .stdin(Stdio::from(dump_file.reopen()?));
    tool::run(ToolKind::Restore, &mut restore_cmd).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repl() -> ReplicationConfig {
        ReplicationConfig {
            host: "primary.db.internal".to_string(),
            user: "repl".to_string(),
            password: "repl-secret".to_string(),
            root_user: "root".to_string(),
            root_password: "root-secret".to_string(),
        }
    }

    #[test]
    fn change_source_references_configured_values() {
        let sql = change_source_sql(&test_repl());
        assert!(sql.contains("MASTER_HOST='primary.db.internal'"));
        assert!(sql.contains("MASTER_USER='repl'"));
        assert!(sql.contains("MASTER_PASSWORD='repl-secret'"));
        assert!(sql.contains("MASTER_PORT=3306"));
        assert!(sql.contains("MASTER_CONNECT_RETRY=10"));
        // the administrative credential must never leak into the statement
        assert!(!sql.contains("root-secret"));
    }

    #[test]
    fn grant_targets_replication_user() {
        let sql = grant_replication_sql(&test_repl());
        assert!(sql.starts_with("GRANT REPLICATION SLAVE ON *.*"));
        assert!(sql.contains("'repl'@'%'"));
        assert!(sql.contains("IDENTIFIED BY 'repl-secret'"));
    }
}
