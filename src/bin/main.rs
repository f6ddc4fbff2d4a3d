//! pdns-bootstrap binary entry point.

use clap::Parser;
use pdns_bootstrap::{provision, telemetry, tool, Backend, BootstrapError, Config};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use tracing::info;

/// Provision a MySQL-backed PowerDNS authority, then exec the server.
#[derive(Parser, Debug)]
#[command(name = "pdns-bootstrap")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). The file may be absent;
    /// PDNS_-prefixed environment variables always apply on top.
    #[arg(short, long, default_value = "/etc/powerdns/bootstrap.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("PDNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    config.validate()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        mode = ?config.mode,
        db_host = %config.db.host,
        database = %config.db.database,
        "starting pdns-bootstrap"
    );

    tool::render_template(&config.tools, &config.paths.base_template).await?;

    for backend in &config.backends {
        info!(backend = backend.name(), "provisioning backend");
        match backend {
            Backend::Mysql => provision::provision_mysql(&config).await?,
        }

        let template = config
            .paths
            .backend_template_dir
            .join(format!("backend-{}.conf.tpl", backend.name()));
        tool::render_template(&config.tools, &template).await?;
    }

    info!(server = %config.paths.server_binary.display(), "handing off to DNS server");

    // exec returns only on failure; on success this process is the server.
    let err = std::process::Command::new(&config.paths.server_binary).exec();
    Err(BootstrapError::Exec {
        path: config.paths.server_binary.clone(),
        source: err,
    }
    .into())
}
