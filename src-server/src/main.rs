use std::path::PathBuf;

use lane_sync_server::ServerConfig;

const DEFAULT_CONFIG: &str = "lane_sync.json";

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LANE_SYNC_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let config = match ServerConfig::load(&PathBuf::from(&path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rolling_logger::init_logger_with(
        config.log_dir.clone(),
        "lane-sync-server",
        config.logger_config(),
    ) {
        eprintln!("Logging disabled: {}", e);
    }

    if let Err(e) = lane_sync_server::run(config).await {
        log::error!("server stopped: {}", e);
        match rolling_logger::handle().and_then(|logger| logger.active_path()) {
            Some(log_file) => eprintln!("server stopped: {} (see {})", e, log_file.display()),
            None => eprintln!("server stopped: {}", e),
        }
        std::process::exit(1);
    }
}
