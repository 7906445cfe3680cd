//! Report records as read from the system of record
//!
//! A [`ReportRecord`] is read-only input to the analyzer. Backends decode
//! their rows into these types at the boundary so the analyses never see
//! loosely typed data.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Labels
// ======

/// Lifecycle state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
  Submitted,
  Analyzing,
  Analyzed,
  Resolved,
  Rejected,
}

impl ReportStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Submitted => "submitted",
      Self::Analyzing => "analyzing",
      Self::Analyzed => "analyzed",
      Self::Resolved => "resolved",
      Self::Rejected => "rejected",
    }
  }
}

impl FromStr for ReportStatus {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "submitted" => Ok(Self::Submitted),
      "analyzing" => Ok(Self::Analyzing),
      "analyzed" => Ok(Self::Analyzed),
      "resolved" => Ok(Self::Resolved),
      "rejected" => Ok(Self::Rejected),
      other => Err(format!("unknown report status '{other}'")),
    }
  }
}

/// Priority assigned by the upstream analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
  Low,
  Medium,
  High,
  Critical,
}

impl FromStr for PriorityLevel {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      "critical" => Ok(Self::Critical),
      other => Err(format!("unknown priority level '{other}'")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HazardLevel {
  Low,
  Medium,
  High,
}

impl FromStr for HazardLevel {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      other => Err(format!("unknown hazard level '{other}'")),
    }
  }
}

/// Waste-type classification joined onto a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WasteType {
  pub name: String,
  pub recyclable: Option<bool>,
  pub hazard_level: Option<HazardLevel>,
}

// Embeddings
// ==========

/// Fixed-length vector produced upstream; opaque to the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
  /// Wrap a vector, rejecting empty and non-finite input
  pub fn new(values: Vec<f32>) -> Result<Self, String> {
    if values.is_empty() {
      return Err("embedding has no components".to_string());
    }
    if values.iter().any(|v| !v.is_finite()) {
      return Err("embedding contains non-finite components".to_string());
    }
    Ok(Self(values))
  }

  /// Parse the `[0.1,0.2,...]` text form used by vector SQL functions
  pub fn parse_text(text: &str) -> Result<Self, String> {
    let values: Vec<f32> =
      serde_json::from_str(text.trim()).map_err(|e| format!("malformed embedding text: {e}"))?;
    Self::new(values)
  }

  /// Render in the text form accepted by `VEC_FROM_TEXT`
  pub fn to_text(&self) -> String {
    let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }

  pub fn dimension(&self) -> usize {
    self.0.len()
  }
}

impl fmt::Display for Embedding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Embedding(dim={})", self.0.len())
  }
}

// Records
// =======

/// A waste report with its upstream analysis results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
  pub report_id: i64,
  pub latitude: f64,
  pub longitude: f64,
  pub address_text: Option<String>,
  pub description: Option<String>,
  pub report_date: DateTime<Utc>,
  pub status: ReportStatus,
  pub image_url: Option<String>,
  pub image_embedding: Embedding,
  pub location_embedding: Option<Embedding>,
  pub full_description: Option<String>,
  /// 0-100
  pub confidence_score: Option<f64>,
  /// 0-10
  pub severity_score: Option<f64>,
  pub estimated_volume: Option<f64>,
  pub priority_level: Option<PriorityLevel>,
  pub waste_type: Option<WasteType>,
  pub username: Option<String>,
}

impl ReportRecord {
  /// A freshly analyzed report with no scores, classification or address
  pub fn new(report_id: i64, image_embedding: Embedding, report_date: DateTime<Utc>) -> Self {
    Self {
      report_id,
      latitude: 0.0,
      longitude: 0.0,
      address_text: None,
      description: None,
      report_date,
      status: ReportStatus::Analyzed,
      image_url: None,
      image_embedding,
      location_embedding: None,
      full_description: None,
      confidence_score: None,
      severity_score: None,
      estimated_volume: None,
      priority_level: None,
      waste_type: None,
      username: None,
    }
  }

  pub fn waste_type_name(&self) -> Option<&str> {
    self.waste_type.as_ref().map(|w| w.name.as_str()).filter(|name| !name.is_empty())
  }

  // Missing scores count as zero in every aggregate.

  pub fn severity(&self) -> f64 {
    self.severity_score.unwrap_or(0.0)
  }

  pub fn confidence(&self) -> f64 {
    self.confidence_score.unwrap_or(0.0)
  }

  pub fn volume(&self) -> f64 {
    self.estimated_volume.unwrap_or(0.0)
  }

  /// The identifying fields echoed back in analysis results
  pub fn summary(&self) -> ReportSummary {
    ReportSummary {
      report_id: self.report_id,
      waste_type: self.waste_type_name().map(str::to_string),
      description: self.description.clone(),
      address_text: self.address_text.clone(),
    }
  }
}

/// Short description of a report inside a pattern or outlier entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSummary {
  pub report_id: i64,
  pub waste_type: Option<String>,
  pub description: Option<String>,
  pub address_text: Option<String>,
}
