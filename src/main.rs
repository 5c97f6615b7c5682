use anyhow::Result;
use remeha_home::config::Config;
use remeha_home::host::MemoryHost;
use remeha_home::plugin::{HostCommand, RemehaPlugin};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    remeha_home::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Remeha Home {} starting up", env!("APP_VERSION"));

    // Host commands arrive here; the standalone binary has no UI feeding it
    let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let mut plugin = RemehaPlugin::new(config, MemoryHost::new());
    match plugin.run(cmd_rx, shutdown_rx).await {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Plugin failed with error: {}", e);
            Err(anyhow::anyhow!("Plugin error: {}", e))
        }
    }
}
