use animal_lens::config::Configuration;
use animal_lens::coordinator::CoordinatorBuilder;
use animal_lens::error::AppError;
use animal_lens::http;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let configuration = Configuration::load()?;
    init_logging(&configuration.log_level);

    if configuration.narrative.api_key.is_none() {
        warn!("No narrative API key configured, every narrative will use the fallback text");
    }

    let server = configuration.server.clone();
    let coordinator = CoordinatorBuilder::new(configuration).build()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal.cancel();
            }
            Err(e) => warn!("Unable to listen for the shutdown signal: {}", e),
        }
    });

    http::serve(coordinator.app_state(), &server, shutdown).await?;
    coordinator.stop();
    Ok(())
}
