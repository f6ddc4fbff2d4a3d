//! MySQL backend provisioning.
//!
//! Ensures the target database exists, the application user can reach it,
//! and the schema is populated: from the schema file on a primary, by
//! cloning the upstream on a replica. Everything is sequential and
//! fail-fast; only connection establishment is retried.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{Config, DbConfig, Mode};
use crate::error::BootstrapError;
use crate::replica;

/// Attempts before giving up on a database connection.
const CONNECT_ATTEMPTS: u32 = 5;

/// Delay between connection attempts.
const CONNECT_DELAY: Duration = Duration::from_secs(2);

/// Connect with a bounded retry.
///
/// The database container may still be starting when this entrypoint runs.
/// Only connection establishment is retried; provisioning statements and the
/// dump/restore pair are never re-run.
pub(crate) async fn connect_with_retry(
    opts: &MySqlConnectOptions,
) -> Result<MySqlConnection, sqlx::Error> {
    let mut attempt = 1;
    loop {
        match opts.connect().await {
            Ok(conn) => return Ok(conn),
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                warn!(attempt, error = %err, "database connection failed, retrying");
                attempt += 1;
                tokio::time::sleep(CONNECT_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn app_options(db: &DbConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.database)
}

fn root_options(db: &DbConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.root_user)
        .password(&db.root_password)
}

// Identifiers and grantees cannot be bound parameters; the interpolated
// values come from deploy configuration, not from untrusted input.

fn create_database_sql(db: &DbConfig) -> String {
    format!("CREATE DATABASE IF NOT EXISTS `{}`", db.database)
}

fn grant_app_all_sql(db: &DbConfig) -> String {
    format!(
        "GRANT ALL ON `{}`.* TO '{}'@'%' IDENTIFIED BY '{}'",
        db.database, db.user, db.password
    )
}

fn grant_app_replication_sql(db: &DbConfig) -> String {
    // REPLICATION SLAVE is a global privilege and needs its own grant.
    format!("GRANT REPLICATION SLAVE ON *.* TO '{}'@'%'", db.user)
}

/// Provision the MySQL backend for the configured mode.
///
/// On a database with existing tables this is a no-op beyond the check
/// itself, which is what makes container restarts safe.
pub async fn provision_mysql(cfg: &Config) -> Result<(), BootstrapError> {
    let db = &cfg.db;

    // First boot of the database container: the application user may not
    // exist yet. Fall back to administrative credentials and create it.
    let mut conn = match app_options(db).connect().await {
        Ok(conn) => {
            info!(user = %db.user, database = %db.database, "connected with application user");
            conn
        }
        Err(err) => {
            warn!(
                user = %db.user,
                error = %err,
                "application user connection failed, provisioning as administrator"
            );
            let mut root = connect_with_retry(&root_options(db)).await?;
            root.execute(create_database_sql(db).as_str()).await?;
            root.execute(grant_app_all_sql(db).as_str()).await?;
            root.execute(grant_app_replication_sql(db).as_str()).await?;
            root.execute("FLUSH PRIVILEGES").await?;
            root.close().await?;

            app_options(db).connect().await?
        }
    };

    info!("checking for existing tables");
    let tables = conn.fetch_all("SHOW TABLES").await?;
    if !tables.is_empty() {
        info!(tables = tables.len(), "tables already exist, nothing to do");
        conn.close().await?;
        return Ok(());
    }

    match cfg.mode {
        Mode::Primary => import_schema(&mut conn, &cfg.paths.schema).await?,
        Mode::Replica => {
            // validate() guarantees the section exists in replica mode
            let repl = cfg.replication.as_ref().ok_or_else(|| {
                BootstrapError::Config("replica mode requires a [replication] section".into())
            })?;
            replica::bootstrap(db, repl, &cfg.tools, &cfg.paths.scratch_dir).await?;
        }
    }

    conn.close().await?;
    Ok(())
}

/// Import the schema file into an empty database, one statement at a time.
async fn import_schema(
    conn: &mut MySqlConnection,
    schema: &Path,
) -> Result<(), BootstrapError> {
    info!(schema = %schema.display(), "importing schema");
    let sql = fs::read_to_string(schema).await?;

    for statement in split_statements(&sql) {
        debug!(statement, "executing schema statement");
        conn.execute(statement).await?;
    }
    Ok(())
}

/// Split a schema file into individual statements.
///
/// Naive on purpose: the PowerDNS schema contains no string literals with
/// embedded semicolons.
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_statements_trims_and_drops_empties() {
        let sql = "CREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);\n";
        let statements: Vec<&str> = split_statements(sql).collect();
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn split_statements_empty_input() {
        assert_eq!(split_statements("  \n ;; \n").count(), 0);
    }

    #[test]
    fn grants_scope_app_user_to_database() {
        let db = DbConfig {
            database: "powerdns-auth".to_string(),
            user: "pdns-auth".to_string(),
            password: "app-secret".to_string(),
            ..DbConfig::default()
        };
        let all = grant_app_all_sql(&db);
        assert!(all.contains("ON `powerdns-auth`.*"));
        assert!(all.contains("'pdns-auth'@'%'"));
        assert!(all.contains("IDENTIFIED BY 'app-secret'"));

        let repl = grant_app_replication_sql(&db);
        assert!(repl.contains("ON *.*"));
        assert!(repl.contains("'pdns-auth'@'%'"));
    }

    #[test]
    fn create_database_quotes_identifier() {
        let db = DbConfig::default();
        assert_eq!(
            create_database_sql(&db),
            "CREATE DATABASE IF NOT EXISTS `powerdns-auth`"
        );
    }
}
