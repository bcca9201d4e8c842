//! camlink server
//!
//! Bridges HTTP clients and MQTT cameras: request/response commands over the
//! bus, device pairing, and status tracking.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use camlink_core::config::{self, Config};
use camlink_core::tracing_init::init_tracing;

use camlink_server::api::{AppState, build_router};
use camlink_server::auth::JwtManager;
use camlink_server::service::CamService;
use camlink_server::storage::CamDatabase;
use camlink_server::transport::MqttTransport;

#[derive(Parser, Debug)]
#[command(name = "camlink-server")]
#[command(
    version,
    about = "camlink server - MQTT command correlation and device pairing for IoT cameras"
)]
struct Args {
    /// Path to a JSON config file (layered over the global settings).
    #[arg(long, env = "CAMLINK_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// MQTT broker URL (`mqtt://host:port`).
    #[arg(long)]
    broker_url: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Flags win over every other configuration source.
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.http_addr = addr;
        }
        if let Some(path) = &self.db_path {
            config.server.database_path = Some(path.clone());
        }
        if let Some(url) = &self.broker_url {
            config.mqtt.broker_url.clone_from(url);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("camlink_server=info", args.log_json);

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.http_addr,
        broker = %config.mqtt.broker_url,
        "Starting camlink-server"
    );

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => config::default_database_path().context("Cannot determine home directory")?,
    };
    info!(path = %db_path.display(), "Opening database");
    let db = CamDatabase::open(&db_path).await?;

    let (transport, event_loop) = MqttTransport::new(&config.mqtt)?;
    let service = Arc::new(CamService::new(
        db.clone(),
        Arc::new(transport),
        &config.timeouts,
    ));
    let mqtt_task = event_loop.spawn(service.router());

    let jwt = Arc::new(JwtManager::new(
        config.server.jwt_secret.as_bytes(),
        config.server.jwt_ttl_secs,
    ));
    let app = build_router(
        AppState::new(Arc::clone(&service), jwt),
        &config.server.cors_origin,
    );

    let listener = tokio::net::TcpListener::bind(config.server.http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.http_addr))?;
    info!(addr = %config.server.http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    match tokio::time::timeout(Duration::from_secs(5), mqtt_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "MQTT event loop task failed"),
        Err(_) => warn!("MQTT event loop did not stop in time"),
    }
    db.close().await;

    info!("camlink-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Received shutdown signal");
}
