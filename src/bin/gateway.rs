use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};

use fileshare::gateway::GatewayServer;
use fileshare::{Config, Database};

fn load_config() -> Config {
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_config();

    if let Err(e) = fileshare::logging::init(&config.logging, Some("gateway")) {
        eprintln!("Failed to initialize logging: {e}");
        fileshare::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("FileShare gateway");

    // Sessions are checked against the same store the authority writes.
    let store_timeout = Duration::from_secs(config.authority.store_timeout_secs);
    let db = match Database::open(&config.database.path, store_timeout).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match GatewayServer::new(&config, &db) {
        Ok(server) => server.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Gateway stopped: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
