//! Similarity analysis over a computed distance matrix

use std::cmp::Ordering;

use crate::distance::{similarity_from_distance, DistanceMatrix};
use crate::report::ReportRecord;
use crate::response::{Outlier, SimilarPair};

/// Pairs closer than this cosine distance count as a common pattern
pub const HIGH_SIMILARITY_DISTANCE: f64 = 0.2;
pub const MAX_COMMON_PATTERNS: usize = 10;
pub const MAX_OUTLIERS: usize = 3;

pub const PAIR_PATTERN_TYPE: &str = "High similarity match";
pub const LOW_SIMILARITY_REASON: &str = "Low similarity to other reports in batch";

#[derive(Debug, Clone)]
pub struct SimilarityAnalysis {
  pub matrix: DistanceMatrix,
  pub common_patterns: Vec<SimilarPair>,
  pub outliers: Vec<Outlier>,
}

/// Extract common patterns and outliers; `matrix` is indexed like `reports`
pub fn analyze(reports: &[ReportRecord], matrix: DistanceMatrix) -> SimilarityAnalysis {
  let common_patterns = common_patterns(reports, &matrix);
  let outliers = outliers(reports, &matrix);
  SimilarityAnalysis { matrix, common_patterns, outliers }
}

fn common_patterns(reports: &[ReportRecord], matrix: &DistanceMatrix) -> Vec<SimilarPair> {
  let mut close: Vec<(usize, usize, f64)> =
    matrix.pairs().filter(|(_, _, distance)| *distance < HIGH_SIMILARITY_DISTANCE).collect();

  // Ascending distance is descending similarity; ties keep matrix order
  close.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
  close.truncate(MAX_COMMON_PATTERNS);

  close
    .into_iter()
    .map(|(i, j, distance)| SimilarPair {
      similarity_score: similarity_from_distance(distance),
      report_1: reports[i].summary(),
      report_2: reports[j].summary(),
      pattern_type: PAIR_PATTERN_TYPE.to_string(),
    })
    .collect()
}

fn outliers(reports: &[ReportRecord], matrix: &DistanceMatrix) -> Vec<Outlier> {
  let mut ranked: Vec<(usize, f64)> =
    (0..reports.len()).map(|i| (i, matrix.mean_similarity_to_others(i))).collect();

  ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
  ranked.truncate(MAX_OUTLIERS);

  ranked
    .into_iter()
    .map(|(i, avg_similarity)| Outlier {
      report: reports[i].summary(),
      avg_similarity: Some(avg_similarity),
      anomaly_score: None,
      anomaly_reason: LOW_SIMILARITY_REASON.to_string(),
    })
    .collect()
}
