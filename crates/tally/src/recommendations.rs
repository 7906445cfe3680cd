//! Human-readable guidance derived from analysis output
//!
//! Every function here is pure: identical input always yields identical
//! output, in the same order.

use crate::analyzer::AnalysisOutcome;
use crate::anomaly::{AnomalyAnalysis, Deviation};
use crate::patterns::PatternAnalysis;
use crate::report::ReportRecord;
use crate::similarity::SimilarityAnalysis;

/// More distinct waste types than this suggests a coordinated cleanup
pub const MULTI_TYPE_THRESHOLD: usize = 3;

pub fn recommend(reports: &[ReportRecord], outcome: &AnalysisOutcome) -> Vec<String> {
  match outcome {
    AnalysisOutcome::Similarity(analysis) => for_similarity(reports, analysis),
    AnalysisOutcome::Patterns(analysis) => for_patterns(analysis),
    AnalysisOutcome::Anomaly(analysis) => for_anomalies(analysis),
  }
}

pub fn for_similarity(reports: &[ReportRecord], analysis: &SimilarityAnalysis) -> Vec<String> {
  let mut recommendations = Vec::new();

  if !analysis.common_patterns.is_empty() {
    recommendations.push(format!(
      "Found {} highly similar report pairs - consider consolidating cleanup efforts for these locations",
      analysis.common_patterns.len()
    ));
  }

  if !analysis.outliers.is_empty() {
    recommendations.push(format!(
      "{} reports show unique characteristics - may require specialized handling",
      analysis.outliers.len()
    ));
  }

  let mut waste_types: Vec<&str> = reports.iter().filter_map(ReportRecord::waste_type_name).collect();
  waste_types.sort_unstable();
  waste_types.dedup();
  if waste_types.len() > MULTI_TYPE_THRESHOLD {
    recommendations.push(format!(
      "Multiple waste types detected ({}) - consider coordinated multi-type cleanup approach",
      waste_types.len()
    ));
  }

  recommendations
}

pub fn for_patterns(analysis: &PatternAnalysis) -> Vec<String> {
  let mut recommendations = Vec::new();

  if let Some(dominant) = analysis.dominant() {
    recommendations.push(format!(
      "{} is the dominant waste type ({} reports) - focus resources here",
      dominant.waste_type, dominant.count
    ));
  }

  let severe: Vec<&str> = analysis.high_severity().map(|group| group.waste_type.as_str()).collect();
  if !severe.is_empty() {
    recommendations.push(format!(
      "High severity waste types detected: {} - prioritize immediate action",
      severe.join(", ")
    ));
  }

  recommendations
}

pub fn for_anomalies(analysis: &AnomalyAnalysis) -> Vec<String> {
  let mut recommendations = Vec::new();

  if !analysis.findings.is_empty() {
    recommendations.push(format!(
      "{} anomalous reports detected - investigate for data quality or special circumstances",
      analysis.findings.len()
    ));
  }

  if analysis.findings.iter().any(|finding| finding.has(Deviation::Severity)) {
    recommendations.push("Unusual severity patterns detected - verify assessment accuracy".to_string());
  }

  recommendations
}
