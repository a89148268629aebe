use anyhow::Result;
use clap::Parser;
use image_filter_service::models::Config;
use image_filter_service::pipeline::FilterPipeline;
use image_filter_service::server::FilterServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image-filter-service")]
#[command(about = "Serve greyscale 256x256 thumbnails of public images")]
struct CliArgs {
    /// Interface to listen on (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Directory for transient output files (overrides FILTER_TRANSIENT_DIR).
    #[arg(long, value_name = "DIR")]
    transient_dir: Option<PathBuf>,
}

impl CliArgs {
    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.transient_dir {
            config.transient_dir = dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_filter_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => args.apply(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting image-filter-service");

    let pipeline = Arc::new(FilterPipeline::from_config(&config)?);
    let handle = FilterServer::bind(&config.bind_addr(), pipeline)?.spawn()?;
    info!("Press CTRL+C to stop server");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown();
    Ok(())
}
