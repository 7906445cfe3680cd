//! Analysis results and the response assembled around them

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analyzer::AnalysisOutcome;
use crate::report::{ReportRecord, ReportSummary};
use crate::request::AnalysisType;

// Result Entries
// ==============

/// Two reports whose image embeddings are highly similar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarPair {
  /// Similarity in [0, 1] (1 - cosine distance)
  pub similarity_score: f64,
  pub report_1: ReportSummary,
  pub report_2: ReportSummary,
  pub pattern_type: String,
}

/// Aggregate statistics for one waste type within the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WasteTypePattern {
  pub waste_type: String,
  pub count: usize,
  pub avg_severity: f64,
  pub avg_confidence: f64,
  /// Distinct addresses, in order of first appearance
  pub locations: Vec<String>,
  pub pattern_type: String,
}

/// Entry of `common_patterns`; the shape depends on the analysis type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CommonPattern {
  Pair(SimilarPair),
  Group(WasteTypePattern),
}

/// A report that stands out from the rest of the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outlier {
  #[serde(flatten)]
  pub report: ReportSummary,

  /// Mean similarity to the other reports (similarity analysis)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avg_similarity: Option<f64>,

  /// Number of thresholds exceeded (anomaly analysis)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub anomaly_score: Option<u32>,

  pub anomaly_reason: String,
}

/// Body of `results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResults {
  pub common_patterns: Vec<CommonPattern>,
  pub outliers: Vec<Outlier>,
  pub recommendations: Vec<String>,
  /// Pairwise similarity (unit diagonal); empty unless similarity ran
  pub similarity_matrix: Vec<Vec<f64>>,
}

// Metadata
// ========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
  pub earliest: Option<DateTime<Utc>>,
  pub latest: Option<DateTime<Utc>>,
}

/// Whole-batch statistics, independent of which analysis ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchMetadata {
  pub total_reports: usize,
  pub date_range: DateRange,
  pub waste_types: Vec<String>,
  pub avg_confidence: f64,
  pub avg_severity: f64,
}

impl BatchMetadata {
  pub fn from_reports(reports: &[ReportRecord]) -> Self {
    let mut waste_types: Vec<String> = Vec::new();
    for name in reports.iter().filter_map(ReportRecord::waste_type_name) {
      if !waste_types.iter().any(|seen| seen == name) {
        waste_types.push(name.to_string());
      }
    }

    Self {
      total_reports: reports.len(),
      date_range: DateRange {
        earliest: reports.iter().map(|r| r.report_date).min(),
        latest: reports.iter().map(|r| r.report_date).max(),
      },
      waste_types,
      avg_confidence: mean(reports.iter().map(ReportRecord::confidence)),
      avg_severity: mean(reports.iter().map(ReportRecord::severity)),
    }
  }
}

/// Arithmetic mean, zero for an empty sequence
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
  let (total, count) = values.fold((0.0, 0usize), |(total, count), v| (total + v, count + 1));
  if count == 0 {
    0.0
  } else {
    total / count as f64
  }
}

// Response
// ========

/// Complete result of one batch analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchAnalysisResponse {
  pub success: bool,
  pub analysis_type: AnalysisType,
  pub reports_analyzed: usize,
  pub analysis_date: DateTime<Utc>,
  pub results: AnalysisResults,
  pub metadata: BatchMetadata,
}

/// Wrap an analysis outcome with run metadata
pub fn assemble(
  reports: &[ReportRecord],
  outcome: AnalysisOutcome,
  recommendations: Vec<String>,
  analysis_date: DateTime<Utc>,
) -> BatchAnalysisResponse {
  let analysis_type = outcome.analysis_type();

  let results = match outcome {
    AnalysisOutcome::Similarity(analysis) => AnalysisResults {
      similarity_matrix: analysis.matrix.to_similarity_rows(),
      common_patterns: analysis.common_patterns.into_iter().map(CommonPattern::Pair).collect(),
      outliers: analysis.outliers,
      recommendations,
    },
    AnalysisOutcome::Patterns(analysis) => AnalysisResults {
      common_patterns: analysis.groups.into_iter().map(CommonPattern::Group).collect(),
      outliers: Vec::new(),
      recommendations,
      similarity_matrix: Vec::new(),
    },
    AnalysisOutcome::Anomaly(analysis) => AnalysisResults {
      common_patterns: Vec::new(),
      outliers: analysis.findings.iter().map(|finding| finding.to_outlier()).collect(),
      recommendations,
      similarity_matrix: Vec::new(),
    },
  };

  BatchAnalysisResponse {
    success: true,
    analysis_type,
    reports_analyzed: reports.len(),
    analysis_date,
    results,
    metadata: BatchMetadata::from_reports(reports),
  }
}
