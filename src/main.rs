//! fileio-bridge - Entry Point
//!
//! Serves the storage command protocol over stdin/stdout as JSON lines.

use log::{error, info};
use std::process;
use tokio::io::{self, BufReader};
use tokio::sync::watch;

use fileio_bridge::listener::StatusListener;
use fileio_bridge::session::serve_host;
use fileio_bridge::utils::logging::setup_logging;
use fileio_bridge::{BridgeConfig, FileService};

#[tokio::main]
async fn main() {
    setup_logging();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config = match BridgeConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration ({}): {}", config_path, e);
            process::exit(1);
        }
    };

    info!("Launching file bridge...");

    let (stop_listener, shutdown) = watch::channel(false);
    let listener = if config.listener.enabled {
        match StatusListener::bind(&config.listener).await {
            Ok(listener) => Some(tokio::spawn(listener.run(shutdown))),
            Err(e) => {
                error!("Listener disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let (service, outbound) =
        match FileService::start(config.build_backend(), config.service_options()) {
            Ok(started) => started,
            Err(e) => {
                error!("Failed to start file worker: {}", e);
                process::exit(1);
            }
        };

    let stdin = BufReader::new(io::stdin());
    if let Err(e) = serve_host(
        service,
        outbound,
        stdin,
        io::stdout(),
        config.storage.max_message_bytes,
    )
    .await
    {
        error!("Host session ended with error: {}", e);
    }

    let _ = stop_listener.send(true);
    if let Some(listener) = listener {
        if let Err(e) = listener.await {
            error!("Listener task failed: {}", e);
        }
    }

    info!("File bridge stopped");
}
