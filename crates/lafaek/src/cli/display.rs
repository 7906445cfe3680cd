//! Display formatting utilities for CLI output

use colored::*;

use tally::report::ReportSummary;
use tally::response::{CommonPattern, Outlier};
use tally::BatchAnalysisResponse;

/// `#12 (Plastic)`, or just `#12` when unclassified
pub fn report_label(report: &ReportSummary) -> String {
  match &report.waste_type {
    Some(waste_type) => format!("#{} ({})", report.report_id, waste_type),
    None => format!("#{}", report.report_id),
  }
}

pub fn format_pattern(pattern: &CommonPattern) -> String {
  match pattern {
    CommonPattern::Pair(pair) => format!(
      "{} <-> {}  similarity {:.2}",
      report_label(&pair.report_1),
      report_label(&pair.report_2),
      pair.similarity_score
    ),
    CommonPattern::Group(group) => {
      let mut line = format!(
        "{}: {} reports, avg severity {:.1}, avg confidence {:.1}",
        group.waste_type, group.count, group.avg_severity, group.avg_confidence
      );
      if !group.locations.is_empty() {
        line.push_str(&format!(" [{}]", group.locations.join("; ")));
      }
      line
    }
  }
}

pub fn format_outlier(outlier: &Outlier) -> String {
  let mut line = format!("{} - {}", report_label(&outlier.report), outlier.anomaly_reason);
  if let Some(similarity) = outlier.avg_similarity {
    line.push_str(&format!(" (avg similarity {similarity:.2})"));
  }
  if let Some(score) = outlier.anomaly_score {
    line.push_str(&format!(" (score {score})"));
  }
  line
}

/// Print a full analysis result
pub fn display_analysis(response: &BatchAnalysisResponse) {
  let metadata = &response.metadata;

  println!(
    "{} {} analysis of {} reports",
    "▶".cyan(),
    response.analysis_type.to_string().bold(),
    response.reports_analyzed.to_string().yellow()
  );
  if let (Some(earliest), Some(latest)) = (metadata.date_range.earliest, metadata.date_range.latest) {
    println!("  {} {} to {}", "dates:".dimmed(), earliest.format("%Y-%m-%d"), latest.format("%Y-%m-%d"));
  }
  if !metadata.waste_types.is_empty() {
    println!("  {} {}", "waste types:".dimmed(), metadata.waste_types.join(", "));
  }
  println!(
    "  {} severity {:.1}, confidence {:.1}",
    "averages:".dimmed(),
    metadata.avg_severity,
    metadata.avg_confidence
  );

  let results = &response.results;
  if !results.common_patterns.is_empty() {
    println!("\n{}", "Common patterns".blue().bold());
    for pattern in &results.common_patterns {
      println!("  {} {}", "•".green(), format_pattern(pattern));
    }
  }

  if !results.outliers.is_empty() {
    println!("\n{}", "Outliers".blue().bold());
    for outlier in &results.outliers {
      println!("  {} {}", "!".red().bold(), format_outlier(outlier));
    }
  }

  if results.recommendations.is_empty() {
    println!("\n{}", "No recommendations for this batch.".dimmed());
  } else {
    println!("\n{}", "Recommendations".blue().bold());
    for recommendation in &results.recommendations {
      println!("  {} {}", "→".cyan(), recommendation);
    }
  }
}
