use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use lafaek::cli::client::{ClientConfig, DEFAULT_SERVER_URL};
use lafaek::cli::commands;
use tally::AnalysisType;

#[derive(Parser)]
#[command(name = "lafaek")]
#[command(about = "Lafaek - Batch Report Analysis\nFind similar, clustered and anomalous waste reports")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

/// Where the analysis server lives
#[derive(Args)]
struct ServerArgs {
  /// Base URL of the lafaek server
  #[arg(long, env = "LAFAEK_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
  server: String,

  /// Request timeout in seconds
  #[arg(long, env = "LAFAEK_TIMEOUT_SECS", default_value = "60")]
  timeout: u64,
}

impl ServerArgs {
  fn client_config(&self) -> ClientConfig {
    ClientConfig { base_url: self.server.clone(), timeout_secs: self.timeout }
  }
}

#[derive(Subcommand)]
enum Command {
  /// Run a batch analysis over 2-50 reports
  Analyze {
    /// Report IDs to analyze
    #[arg(required = true)]
    report_ids: Vec<i64>,
    /// Analysis to run: similarity, patterns or anomaly
    #[arg(short = 't', long = "type", default_value = "similarity")]
    analysis_type: AnalysisType,
    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    server: ServerArgs,
  },
  /// Check that the server is up
  Status {
    #[command(flatten)]
    server: ServerArgs,
  },
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Analyze { report_ids, analysis_type, json, server } => {
      commands::analyze(&report_ids, analysis_type, server.client_config(), json).await
    }
    Command::Status { server } => commands::status(server.client_config()).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  handle(cli.command).await?;
  Ok(())
}
