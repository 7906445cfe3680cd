//! Mapping of analysis failures onto HTTP responses

use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use uuid::Uuid;

use tally::AnalysisError;

use crate::server::config::Environment;
use crate::server::types::{ApiError, BaseResponse, ErrorBody};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// A failed request, ready to be rendered as an error body
#[derive(Debug)]
pub struct ApiFailure {
  error: AnalysisError,
  transaction_id: Uuid,
  environment: Environment,
}

impl ApiFailure {
  pub fn new(error: AnalysisError, transaction_id: Uuid, environment: Environment) -> Self {
    Self { error, transaction_id, environment }
  }

  pub fn status(&self) -> StatusCode {
    status_for(&self.error)
  }

  fn body(&self) -> ErrorBody {
    let (message, detail) = match &self.error {
      AnalysisError::Store(store_error) => {
        let detail = self.environment.is_development().then(|| store_error.to_string());
        (INTERNAL_ERROR_MESSAGE.to_string(), detail)
      }
      other => (other.to_string(), None),
    };

    ErrorBody {
      success: false,
      message,
      code: self.error.code().to_string(),
      error: detail,
      timestamp: Utc::now(),
    }
  }
}

pub fn status_for(error: &AnalysisError) -> StatusCode {
  match error {
    AnalysisError::Validation { .. } => StatusCode::BAD_REQUEST,
    AnalysisError::NotFound { .. } => StatusCode::NOT_FOUND,
    AnalysisError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
    AnalysisError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    AnalysisError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
  }
}

impl IntoResponse for ApiFailure {
  fn into_response(self) -> Response {
    let status = self.status();
    if let AnalysisError::Store(store_error) = &self.error {
      tracing::error!(transaction_id = %self.transaction_id, error = %store_error, "report store failure");
    }

    let body = self.body();
    let errors = vec![ApiError::new(&body.code, &body.message)];
    (status, Json(BaseResponse::with_errors(body, errors, self.transaction_id))).into_response()
  }
}
