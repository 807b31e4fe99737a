use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::time;
use tracing::{error, info, warn};

use lodestone_config::{config_dir, config_file_path, ConfigStore};
use lodestone_core::HostEvent;
use lodestone_plugins::{builtin, EventBus, PluginManager};

/// Cadence of the host tick stream.
const TICK_INTERVAL: Duration = Duration::from_millis(600);

#[derive(Parser)]
#[command(name = "lodestone")]
#[command(about = "Lodestone — plugin lifecycle and configuration runtime")]
#[command(version)]
struct Cli {
    /// Also load diagnostic-only developer plugins
    #[arg(long)]
    developer_mode: bool,

    /// Override the configuration directory
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Fallback log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for NDJSON log files (console-only when omitted)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    lodestone_logging::init_logger(cli.log_dir.as_deref(), &cli.log_level);

    let dir = cli.config_dir.unwrap_or_else(config_dir);
    let store = Arc::new(ConfigStore::new(config_file_path(&dir)));
    if let Err(e) = store.load().await {
        // recoverable: run with defaults, the next save rewrites the file
        warn!(error = %e, "Failed to load configuration; starting with an empty store");
    }

    let bus = Arc::new(EventBus::new());
    let manager = PluginManager::new(bus, store.clone());
    let _start_handles = manager.load_all(builtin::plugin_factories(), cli.developer_mode);

    run_host_loop(&manager).await;

    info!("Shutting down");
    manager.dispatch(&HostEvent::SessionEnded);
    for handle in manager.stop_all() {
        if let Err(e) = handle.await {
            error!(error = %e, "Plugin stop task panicked");
        }
    }
    if let Err(e) = store.save().await {
        error!(error = %e, "Failed to save configuration");
    }
    Ok(())
}

/// Publish the session start and a fixed-cadence tick stream until ctrl-c.
async fn run_host_loop(manager: &PluginManager) {
    manager.dispatch(&HostEvent::SessionStarted {
        account: "local".to_string(),
    });

    let mut ticker = time::interval(TICK_INTERVAL);
    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                manager.dispatch(&HostEvent::Tick { seq });
                seq += 1;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for interrupt");
                }
                info!("Received interrupt");
                break;
            }
        }
    }
}
