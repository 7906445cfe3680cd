//! Error types for batch analysis and the report store seam

use std::time::Duration;
use thiserror::Error;

/// Failures raised by a report store backend
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Failed to connect to report store: {message}")]
  Connection { message: String },

  #[error("Report store query failed: {message}")]
  Query { message: String },

  #[error("Failed to decode report data: {message}")]
  Decode { message: String },
}

impl StoreError {
  pub fn connection(message: impl Into<String>) -> Self {
    Self::Connection { message: message.into() }
  }

  pub fn query(message: impl Into<String>) -> Self {
    Self::Query { message: message.into() }
  }

  pub fn decode(message: impl Into<String>) -> Self {
    Self::Decode { message: message.into() }
  }
}

/// Failures surfaced to callers of the batch analyzer
#[derive(Error, Debug)]
pub enum AnalysisError {
  /// Bad input shape or size, rejected before the store is touched
  #[error("{message}")]
  Validation { message: String },

  /// Not enough qualifying reports to analyze
  #[error("{message}")]
  NotFound { message: String },

  #[error("Method not allowed")]
  MethodNotAllowed,

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Batch analysis did not finish within {}ms", budget.as_millis())]
  Timeout { budget: Duration },
}

impl AnalysisError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation { message: message.into() }
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound { message: message.into() }
  }

  /// Stable machine-readable code for the error kind
  pub fn code(&self) -> &'static str {
    match self {
      Self::Validation { .. } => "VALIDATION_ERROR",
      Self::NotFound { .. } => "NOT_FOUND",
      Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
      Self::Store(_) => "INTERNAL_ERROR",
      Self::Timeout { .. } => "TIMEOUT",
    }
  }
}
