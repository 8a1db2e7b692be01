use std::sync::Arc;
use treasury_clock::SystemClock;
use treasury_daemon::{Daemon, load_config, load_default_config};

fn print_help() {
    eprintln!(
        r#"Treasury daemon - supervised market data feeds and price-chasing execution

USAGE:
    treasuryd [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    anyhow::bail!("--config requires a path argument");
                };
                config_path = Some(path.clone());
            }
            arg => {
                print_help();
                anyhow::bail!("Unknown argument: {}", arg);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => {
            log::info!("Using embedded default configuration");
            load_default_config()?
        }
    };
    log::info!("Venues: {}", config.venues.len());
    log::info!("Feeds: {}", config.feeds.len());

    let daemon = Daemon::new(config, Arc::new(SystemClock::new()))?;
    daemon.start()?;

    daemon
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await;

    log::info!("Daemon stopped");
    Ok(())
}
