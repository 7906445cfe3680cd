//! Validated batch analysis requests
//!
//! Incoming payloads are checked here, before any store access. A
//! [`BatchRequest`] can only be built through validation, so holding one is
//! proof that the identifier set is well formed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

pub const MIN_BATCH_SIZE: usize = 2;
pub const MAX_BATCH_SIZE: usize = 50;

/// Which analysis to run over the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
  #[default]
  Similarity,
  Patterns,
  Anomaly,
}

impl AnalysisType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Similarity => "similarity",
      Self::Patterns => "patterns",
      Self::Anomaly => "anomaly",
    }
  }
}

impl fmt::Display for AnalysisType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AnalysisType {
  type Err = AnalysisError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "similarity" => Ok(Self::Similarity),
      "patterns" => Ok(Self::Patterns),
      "anomaly" => Ok(Self::Anomaly),
      other => Err(AnalysisError::validation(format!(
        "Unsupported analysisType '{other}' - expected one of: similarity, patterns, anomaly"
      ))),
    }
  }
}

/// Wire shape of a batch analysis request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchAnalysisRequest {
  /// Report identifiers to analyze (2-50 unique)
  #[serde(rename = "reportIds")]
  pub report_ids: Vec<i64>,

  /// Analysis to run (defaults to similarity)
  #[serde(rename = "analysisType", default, skip_serializing_if = "Option::is_none")]
  pub analysis_type: Option<AnalysisType>,
}

/// A batch of report identifiers that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
  report_ids: Vec<i64>,
  analysis_type: AnalysisType,
}

impl BatchRequest {
  /// Validate identifiers: duplicates collapse, ids must be positive and
  /// the unique count must fall within the batch bounds.
  pub fn new(report_ids: Vec<i64>, analysis_type: AnalysisType) -> Result<Self, AnalysisError> {
    let mut seen = HashSet::with_capacity(report_ids.len());
    let mut unique = Vec::with_capacity(report_ids.len());

    for id in report_ids {
      if id <= 0 {
        return Err(AnalysisError::validation(format!("Invalid report ID: {id}")));
      }
      if seen.insert(id) {
        unique.push(id);
      }
    }

    if unique.len() < MIN_BATCH_SIZE {
      return Err(AnalysisError::validation(format!(
        "At least {MIN_BATCH_SIZE} report IDs are required for batch analysis"
      )));
    }
    if unique.len() > MAX_BATCH_SIZE {
      return Err(AnalysisError::validation(format!(
        "Maximum {MAX_BATCH_SIZE} reports allowed for batch analysis"
      )));
    }

    Ok(Self { report_ids: unique, analysis_type })
  }

  /// Validate an untrusted JSON body
  pub fn from_json(body: &Value) -> Result<Self, AnalysisError> {
    let object = body
      .as_object()
      .ok_or_else(|| AnalysisError::validation("Request body must be a JSON object"))?;

    let ids = match object.get("reportIds") {
      None | Some(Value::Null) => {
        return Err(AnalysisError::validation("reportIds is required"));
      }
      Some(Value::Array(items)) => items,
      Some(_) => {
        return Err(AnalysisError::validation("reportIds must be an array of report IDs"));
      }
    };

    let report_ids = ids
      .iter()
      .map(|item| {
        item.as_i64().ok_or_else(|| {
          AnalysisError::validation(format!("reportIds must contain integer report IDs, got {item}"))
        })
      })
      .collect::<Result<Vec<i64>, AnalysisError>>()?;

    let analysis_type = match object.get("analysisType") {
      None | Some(Value::Null) => AnalysisType::default(),
      Some(Value::String(name)) => name.parse()?,
      Some(_) => return Err(AnalysisError::validation("analysisType must be a string")),
    };

    Self::new(report_ids, analysis_type)
  }

  pub fn report_ids(&self) -> &[i64] {
    &self.report_ids
  }

  pub fn analysis_type(&self) -> AnalysisType {
    self.analysis_type
  }
}

impl TryFrom<BatchAnalysisRequest> for BatchRequest {
  type Error = AnalysisError;

  fn try_from(request: BatchAnalysisRequest) -> Result<Self, Self::Error> {
    Self::new(request.report_ids, request.analysis_type.unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn message(err: AnalysisError) -> String {
    assert!(matches!(err, AnalysisError::Validation { .. }), "expected validation error, got {err:?}");
    err.to_string()
  }

  #[test]
  fn test_defaults_to_similarity() {
    let request = BatchRequest::from_json(&json!({ "reportIds": [1, 2] })).unwrap();
    assert_eq!(request.analysis_type(), AnalysisType::Similarity);
    assert_eq!(request.report_ids(), &[1, 2]);
  }

  #[test]
  fn test_rejects_too_few_ids() {
    let err = BatchRequest::from_json(&json!({ "reportIds": [7] })).unwrap_err();
    assert!(message(err).contains("At least 2"));
  }

  #[test]
  fn test_rejects_too_many_ids() {
    let ids: Vec<i64> = (1..=51).collect();
    let err = BatchRequest::new(ids, AnalysisType::Patterns).unwrap_err();
    assert!(message(err).contains("Maximum 50"));
  }

  #[test]
  fn test_accepts_exactly_fifty() {
    let ids: Vec<i64> = (1..=50).collect();
    assert!(BatchRequest::new(ids, AnalysisType::Anomaly).is_ok());
  }

  #[test]
  fn test_duplicates_collapse_before_size_check() {
    let err = BatchRequest::new(vec![4, 4, 4], AnalysisType::Similarity).unwrap_err();
    assert!(message(err).contains("At least 2"));

    let request = BatchRequest::new(vec![9, 3, 9, 5], AnalysisType::Similarity).unwrap();
    assert_eq!(request.report_ids(), &[9, 3, 5]);
  }

  #[test]
  fn test_rejects_string_report_ids() {
    let err = BatchRequest::from_json(&json!({ "reportIds": "1,2,3" })).unwrap_err();
    assert!(message(err).contains("must be an array"));
  }

  #[test]
  fn test_rejects_missing_and_non_integer_ids() {
    let err = BatchRequest::from_json(&json!({ "analysisType": "patterns" })).unwrap_err();
    assert!(message(err).contains("reportIds is required"));

    let err = BatchRequest::from_json(&json!({ "reportIds": [1, "two"] })).unwrap_err();
    assert!(message(err).contains("integer report IDs"));

    let err = BatchRequest::from_json(&json!({ "reportIds": [1, 2.5] })).unwrap_err();
    assert!(message(err).contains("integer report IDs"));
  }

  #[test]
  fn test_rejects_non_positive_ids() {
    let err = BatchRequest::new(vec![1, 0, 2], AnalysisType::Similarity).unwrap_err();
    assert!(message(err).contains("Invalid report ID: 0"));
  }

  #[test]
  fn test_rejects_unknown_analysis_type() {
    let err =
      BatchRequest::from_json(&json!({ "reportIds": [1, 2], "analysisType": "clusters" })).unwrap_err();
    assert!(message(err).contains("Unsupported analysisType 'clusters'"));
  }

  #[test]
  fn test_wire_request_conversion() {
    let wire: BatchAnalysisRequest =
      serde_json::from_value(json!({ "reportIds": [3, 1], "analysisType": "anomaly" })).unwrap();
    let request = BatchRequest::try_from(wire).unwrap();
    assert_eq!(request.analysis_type(), AnalysisType::Anomaly);
    assert_eq!(request.report_ids(), &[3, 1]);
  }
}
