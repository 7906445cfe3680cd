//! Anomaly analysis: reports whose scores stray far from the batch mean

use std::fmt;

use crate::report::{ReportRecord, ReportSummary};
use crate::response::{mean, Outlier};

pub const MAX_ANOMALIES: usize = 5;

/// A score that deviated beyond its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deviation {
  Severity,
  Confidence,
  Volume,
}

impl Deviation {
  pub const ALL: [Deviation; 3] = [Deviation::Severity, Deviation::Confidence, Deviation::Volume];

  /// Allowed deviation as a fraction of the batch mean
  pub fn tolerance(&self) -> f64 {
    match self {
      Self::Severity => 0.5,
      Self::Confidence => 0.3,
      Self::Volume => 0.7,
    }
  }

  pub fn reason(&self) -> &'static str {
    match self {
      Self::Severity => "Unusual severity score",
      Self::Confidence => "Unusual confidence score",
      Self::Volume => "Unusual waste volume",
    }
  }

  fn value(&self, report: &ReportRecord) -> f64 {
    match self {
      Self::Severity => report.severity(),
      Self::Confidence => report.confidence(),
      Self::Volume => report.volume(),
    }
  }
}

impl fmt::Display for Deviation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.reason())
  }
}

/// Batch means used as the reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMeans {
  pub severity: f64,
  pub confidence: f64,
  pub volume: f64,
}

impl BatchMeans {
  pub fn of(reports: &[ReportRecord]) -> Self {
    Self {
      severity: mean(reports.iter().map(ReportRecord::severity)),
      confidence: mean(reports.iter().map(ReportRecord::confidence)),
      volume: mean(reports.iter().map(ReportRecord::volume)),
    }
  }

  fn get(&self, deviation: Deviation) -> f64 {
    match deviation {
      Deviation::Severity => self.severity,
      Deviation::Confidence => self.confidence,
      Deviation::Volume => self.volume,
    }
  }

  /// Thresholds the report exceeds, in fixed order
  pub fn deviations(&self, report: &ReportRecord) -> Vec<Deviation> {
    Deviation::ALL
      .into_iter()
      .filter(|deviation| {
        let reference = self.get(*deviation);
        (deviation.value(report) - reference).abs() > reference * deviation.tolerance()
      })
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFinding {
  pub report: ReportSummary,
  pub deviations: Vec<Deviation>,
}

impl AnomalyFinding {
  pub fn score(&self) -> u32 {
    self.deviations.len() as u32
  }

  pub fn reason(&self) -> String {
    self.deviations.iter().map(Deviation::reason).collect::<Vec<_>>().join(", ")
  }

  pub fn has(&self, deviation: Deviation) -> bool {
    self.deviations.contains(&deviation)
  }

  pub fn to_outlier(&self) -> Outlier {
    Outlier {
      report: self.report.clone(),
      avg_similarity: None,
      anomaly_score: Some(self.score()),
      anomaly_reason: self.reason(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AnomalyAnalysis {
  pub means: BatchMeans,
  /// Highest score first, at most [`MAX_ANOMALIES`]
  pub findings: Vec<AnomalyFinding>,
}

pub fn analyze(reports: &[ReportRecord]) -> AnomalyAnalysis {
  let means = BatchMeans::of(reports);

  let mut findings: Vec<AnomalyFinding> = reports
    .iter()
    .filter_map(|report| {
      let deviations = means.deviations(report);
      (!deviations.is_empty()).then(|| AnomalyFinding { report: report.summary(), deviations })
    })
    .collect();

  // Stable: equal scores keep fetch order
  findings.sort_by_key(|finding| std::cmp::Reverse(finding.score()));
  findings.truncate(MAX_ANOMALIES);

  AnomalyAnalysis { means, findings }
}
