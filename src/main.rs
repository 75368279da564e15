use std::path::PathBuf;

use clap::Parser;
use swerve_zenoh_runtime::config::DriveConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Swerve drive control runtime
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the control loop rate
    #[arg(long)]
    loop_hz: Option<u64>,

    /// Override the maximum module speed (m/s)
    #[arg(long)]
    max_speed: Option<f64>,
}

fn load_config(args: &Args) -> Result<DriveConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            DriveConfig::load(path)?
        }
        None => DriveConfig::default(),
    };
    if let Some(loop_hz) = args.loop_hz {
        config.loop_hz = loop_hz;
    }
    if let Some(max_speed) = args.max_speed {
        config.max_speed = max_speed;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = swerve_zenoh_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
