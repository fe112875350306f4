//! Rowshift Game Server
//!
//! Reads configuration from the environment and serves games over WebSocket
//! until interrupted.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rowshift::{AppConfig, GameServer, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = AppConfig::from_env().context("Invalid configuration")?;

    info!("Rowshift Server v{}", VERSION);
    info!(
        "Shift policy: {}, max board dimension: {}",
        config.engine.shift_policy, config.engine.max_dimension
    );
    if !config.auth.is_configured() {
        info!("No AUTH_SECRET or AUTH_PUBLIC_KEY_PEM set, tokens are taken as identities");
    }

    let server = GameServer::new(config.server, config.engine, config.auth);

    tokio::select! {
        result = server.run() => {
            result.context("Server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
