//! Batch analysis endpoint handlers

use axum::{
  body::Bytes,
  extract::{Extension, State},
  response::Json,
};
use serde_json::Value;

use tally::{AnalysisError, BatchAnalysisResponse, BatchRequest};

use crate::server::error::ApiFailure;
use crate::server::middleware::RequestContext;
use crate::server::routing::AppState;
use crate::server::types::BaseResponse;

/// POST /api/vector-search/batch-analysis - Analyze a batch of reports
///
/// The body is validated in full before the report store is touched.
pub async fn batch_analysis(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  body: Bytes,
) -> Result<Json<BaseResponse<BatchAnalysisResponse>>, ApiFailure> {
  let fail = |error: AnalysisError| {
    context.log_warn(&format!("batch analysis rejected: {error}"));
    ApiFailure::new(error, context.request_id, state.environment())
  };

  let value: Value = serde_json::from_slice(&body)
    .map_err(|e| fail(AnalysisError::validation(format!("Request body is not valid JSON: {e}"))))?;
  let request = BatchRequest::from_json(&value).map_err(fail)?;

  context.log_info(&format!(
    "running {} analysis over {} reports",
    request.analysis_type(),
    request.report_ids().len()
  ));

  let response = state.analyzer().analyze(&request).await.map_err(fail)?;

  context.log_info(&format!(
    "{} analysis finished: {} patterns, {} outliers",
    response.analysis_type,
    response.results.common_patterns.len(),
    response.results.outliers.len()
  ));

  Ok(Json(BaseResponse::success(response, context.request_id)))
}

/// Any other method on the batch analysis routes
pub async fn method_not_allowed(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> ApiFailure {
  context.log_warn("method not allowed");
  ApiFailure::new(AnalysisError::MethodNotAllowed, context.request_id, state.environment())
}
