//! sealmail-server: accepts sealmail connections and stores delivered mail.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use sealmail_core::{ServerConfig, StoreBackend};
use sealmail_protocol::ProcessorSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = sealmail_cli::init_logging("sealmail-server.log");

    let config = ServerConfig::from_env()?;
    let store = sealmail_db::open_store(&config)
        .await
        .context("Failed to open mail store")?;

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(
        subsystem = "server",
        component = "main",
        address = %address,
        store = match config.store {
            StoreBackend::Memory => "memory",
            StoreBackend::Postgres { .. } => "postgres",
        },
        max_body_lines = config.max_body_lines,
        max_body_bytes = config.max_body_bytes,
        "sealmail server listening"
    );

    let settings = ProcessorSettings::from_config(&config);
    sealmail_cli::serve(listener, store, settings, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    info!(subsystem = "server", component = "main", "sealmail server stopped");
    Ok(())
}
