//! HTTP client for the lafaek REST API

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use tally::{BatchAnalysisRequest, BatchAnalysisResponse};

use crate::server::routing::BATCH_ANALYSIS_PATH;
use crate::server::types::{BaseResponse, ErrorBody, StatusResponse};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Configuration for the lafaek HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the lafaek server (e.g., "http://localhost:3000")
  pub base_url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_SERVER_URL.to_string(), timeout_secs: 60 }
  }
}

/// HTTP client for the lafaek REST API
pub struct LafaekClient {
  client: Client,
  config: ClientConfig,
}

impl LafaekClient {
  pub fn with_config(config: ClientConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self { client, config })
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Run a batch analysis on the server
  pub async fn batch_analysis(&self, request: &BatchAnalysisRequest) -> Result<BatchAnalysisResponse> {
    let url = self.url(BATCH_ANALYSIS_PATH);
    let response = self
      .client
      .post(&url)
      .json(request)
      .send()
      .await
      .with_context(|| format!("Failed to reach lafaek server at {}", self.config.base_url))?;

    let result: BaseResponse<BatchAnalysisResponse> = decode(response, "Batch analysis failed").await?;
    Ok(result.data)
  }

  /// Query server health
  pub async fn status(&self) -> Result<StatusResponse> {
    let url = self.url("/status");
    let response = self
      .client
      .get(&url)
      .send()
      .await
      .with_context(|| format!("Failed to reach lafaek server at {}", self.config.base_url))?;

    let result: BaseResponse<StatusResponse> = decode(response, "Status check failed").await?;
    Ok(result.data)
  }
}

async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
  let status = response.status();
  if status.is_success() {
    return response.json().await.with_context(|| format!("{action}: unreadable response body"));
  }

  let text = response.text().await.unwrap_or_default();
  Err(match serde_json::from_str::<BaseResponse<ErrorBody>>(&text) {
    Ok(body) => match body.data.error {
      Some(detail) => anyhow!("{action} ({status}): {} [{}]: {detail}", body.data.message, body.data.code),
      None => anyhow!("{action} ({status}): {} [{}]", body.data.message, body.data.code),
    },
    Err(_) => anyhow!("{action} ({status}): {text}"),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_joins_without_double_slash() {
    let client = LafaekClient::with_config(ClientConfig {
      base_url: "http://analysis.local:8080/".to_string(),
      timeout_secs: 5,
    })
    .unwrap();

    assert_eq!(
      client.url(BATCH_ANALYSIS_PATH),
      "http://analysis.local:8080/api/vector-search/batch-analysis"
    );
  }
}
