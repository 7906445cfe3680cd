//! Lafaek REST Server
//!
//! HTTP REST API server for batch analysis of waste reports stored in TiDB.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use lafaek::server::config::{ConfigOverrides, ServiceConfig};
use lafaek::server::startup::start_server;

#[derive(Parser)]
#[command(name = "lafaek_server")]
#[command(about = "Lafaek Batch Analysis REST API Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
  /// YAML config file (defaults to ~/.lafaek/server.yaml when present)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(flatten)]
  overrides: ConfigOverrides,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let filter = if args.verbose {
    EnvFilter::new("debug,sqlx=info,hyper=info")
  } else {
    EnvFilter::new("lafaek=info,tally=info,tower_http=info,sqlx=warn,warn")
  };

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let config = ServiceConfig::load(args.config.as_deref())?.apply(&args.overrides);
  tracing::info!("Starting Lafaek REST Server v{}", env!("CARGO_PKG_VERSION"));
  tracing::info!("Binding to address: {}", config.bind);

  start_server(config).await?;

  Ok(())
}
