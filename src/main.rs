use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use jeego::{constants::DEFAULT_CONFIG_PATH, http, Config, ConnectionListener, HttpFetcher};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// FreeSWITCH gateway for remote XML call flows.
#[derive(Debug, Parser)]
#[command(name = "jeego", version, about)]
struct Args {
    /// Configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jeego=info")),
        )
        .init();

    let args = Args::parse();
    let config = Arc::new(Config::load(&args.config)?);
    info!(
        "Loaded {} with {} routes",
        args.config.display(),
        config.routes.len()
    );

    let fetcher = Arc::new(HttpFetcher::new()?);
    let control = ConnectionListener::bind(Arc::clone(&config), fetcher).await?;
    let http_listener = TcpListener::bind(&config.http_bind_to).await?;

    tokio::select! {
        result = control.run() => {
            if let Err(e) = &result {
                error!("Control listener stopped: {}", e);
            }
            result?;
        }
        result = http::serve(http_listener, Arc::clone(&config)) => {
            if let Err(e) = &result {
                error!("HTTP trigger stopped: {}", e);
            }
            result?;
        }
    }
    Ok(())
}
