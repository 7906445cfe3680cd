//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};
use std::sync::Arc;

use tally::BatchAnalyzer;

use crate::server::config::Environment;
use crate::server::handlers::{analysis, status};
use crate::server::middleware::request_context_middleware;

pub const BATCH_ANALYSIS_PATH: &str = "/api/vector-search/batch-analysis";
pub const BATCH_ANALYSIS_ALIAS: &str = "/batch-analysis";

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
  analyzer: Arc<BatchAnalyzer>,
  environment: Environment,
}

impl AppState {
  pub fn new(analyzer: BatchAnalyzer, environment: Environment) -> Self {
    Self { analyzer: Arc::new(analyzer), environment }
  }

  pub fn analyzer(&self) -> &BatchAnalyzer {
    &self.analyzer
  }

  pub fn environment(&self) -> Environment {
    self.environment
  }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  let batch_analysis = post(analysis::batch_analysis).fallback(analysis::method_not_allowed);

  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    // Batch analysis
    .route(BATCH_ANALYSIS_PATH, batch_analysis.clone())
    .route(BATCH_ANALYSIS_ALIAS, batch_analysis)
    .layer(middleware::from_fn(request_context_middleware))
    .with_state(state)
}
