use anyhow::Result;
use colored::*;

use tally::{AnalysisType, BatchAnalysisRequest, BatchRequest};

use crate::cli::client::{ClientConfig, LafaekClient};
use crate::cli::display::display_analysis;

/// Analyze a batch of reports on the server
///
/// The batch is validated locally first so obviously bad input never
/// leaves the machine.
pub async fn analyze(
  report_ids: &[i64],
  analysis_type: AnalysisType,
  config: ClientConfig,
  json: bool,
) -> Result<()> {
  let batch = BatchRequest::new(report_ids.to_vec(), analysis_type)?;
  let request = BatchAnalysisRequest {
    report_ids: batch.report_ids().to_vec(),
    analysis_type: Some(batch.analysis_type()),
  };

  let client = LafaekClient::with_config(config)?;
  let response = client.batch_analysis(&request).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&response)?);
  } else {
    display_analysis(&response);
  }
  Ok(())
}

/// Show server health
pub async fn status(config: ClientConfig) -> Result<()> {
  let base_url = config.base_url.clone();
  let client = LafaekClient::with_config(config)?;
  let status = client.status().await?;

  println!(
    "{} {} at {} (v{}, {})",
    "✓".green(),
    status.status.green().bold(),
    base_url.cyan(),
    status.version,
    status.environment
  );
  Ok(())
}
