use reqlimit::{config::ReqLimitConfig, init_tracing, serve};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Without a config file, run with defaults
    let mut config = match env::args().nth(1) {
        Some(path) => match ReqLimitConfig::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", path, e);
                eprintln!("Usage: reqlimit [config_file]");
                process::exit(1);
            }
        },
        None => ReqLimitConfig::default_config(),
    };

    if let Err(e) = config.apply_env_overrides() {
        eprintln!("Invalid environment configuration: {}", e);
        process::exit(1);
    }

    if let Err(e) = serve(config).await {
        eprintln!("Server error: {}", e);
        process::exit(1);
    }
}
