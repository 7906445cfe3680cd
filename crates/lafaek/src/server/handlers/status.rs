//! Status and version endpoint handlers

use axum::{
  extract::{Extension, State},
  response::Json,
};

use crate::server::middleware::RequestContext;
use crate::server::routing::AppState;
use crate::server::types::{ApiInfoResponse, ApiVersions, BaseResponse, StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> Json<BaseResponse<StatusResponse>> {
  let response = StatusResponse {
    status: "healthy".to_string(),
    environment: state.environment(),
    version: env!("CARGO_PKG_VERSION").to_string(),
  };

  Json(BaseResponse::success(response, context.request_id))
}

/// GET /version - Returns current API version
pub async fn version(Extension(context): Extension<RequestContext>) -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, context.request_id))
}

/// GET /api - Returns API information and supported versions
pub async fn api_info(Extension(context): Extension<RequestContext>) -> Json<BaseResponse<ApiInfoResponse>> {
  let version = env!("CARGO_PKG_VERSION");
  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
  };

  Json(BaseResponse::success(response, context.request_id))
}
