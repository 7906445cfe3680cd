//! Waste-type pattern analysis

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::report::ReportRecord;
use crate::response::{mean, WasteTypePattern};

pub const UNKNOWN_WASTE_TYPE: &str = "Unknown";
/// Mean severity above which a waste type is called out (0-10 scale)
pub const HIGH_SEVERITY_THRESHOLD: f64 = 7.0;
pub const GROUP_PATTERN_TYPE: &str = "Waste type clustering";

#[derive(Debug, Clone)]
pub struct PatternAnalysis {
  /// Ordered by count desc, mean severity desc, then name
  pub groups: Vec<WasteTypePattern>,
}

impl PatternAnalysis {
  /// The largest group; ties go to the more severe, then alphabetical, type
  pub fn dominant(&self) -> Option<&WasteTypePattern> {
    self.groups.first()
  }

  pub fn high_severity(&self) -> impl Iterator<Item = &WasteTypePattern> {
    self.groups.iter().filter(|group| group.avg_severity > HIGH_SEVERITY_THRESHOLD)
  }
}

/// Partition the batch by waste type and aggregate each group
pub fn analyze(reports: &[ReportRecord]) -> PatternAnalysis {
  let mut order: Vec<&str> = Vec::new();
  let mut members: HashMap<&str, Vec<&ReportRecord>> = HashMap::new();

  for report in reports {
    let name = report.waste_type_name().unwrap_or(UNKNOWN_WASTE_TYPE);
    members
      .entry(name)
      .or_insert_with(|| {
        order.push(name);
        Vec::new()
      })
      .push(report);
  }

  let mut groups: Vec<WasteTypePattern> = order
    .into_iter()
    .map(|name| {
      let group = members.remove(name).unwrap_or_default();
      summarize(name, &group)
    })
    .collect();

  groups.sort_by(|a, b| {
    b.count
      .cmp(&a.count)
      .then_with(|| b.avg_severity.partial_cmp(&a.avg_severity).unwrap_or(Ordering::Equal))
      .then_with(|| a.waste_type.cmp(&b.waste_type))
  });

  PatternAnalysis { groups }
}

fn summarize(name: &str, group: &[&ReportRecord]) -> WasteTypePattern {
  let mut locations: Vec<String> = Vec::new();
  for address in group.iter().filter_map(|r| r.address_text.as_deref()) {
    let address = address.trim();
    if !address.is_empty() && !locations.iter().any(|seen| seen == address) {
      locations.push(address.to_string());
    }
  }

  WasteTypePattern {
    waste_type: name.to_string(),
    count: group.len(),
    avg_severity: mean(group.iter().map(|r| r.severity())),
    avg_confidence: mean(group.iter().map(|r| r.confidence())),
    locations,
    pattern_type: GROUP_PATTERN_TYPE.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{report, typed_report};

  #[test]
  fn test_groups_partition_the_batch() {
    let reports = vec![
      typed_report(1, "Plastic", 8.0),
      typed_report(2, "Organic", 2.0),
      report(3),
      typed_report(4, "Plastic", 9.0),
      typed_report(5, "Metal", 5.0),
    ];

    let analysis = analyze(&reports);

    let total: usize = analysis.groups.iter().map(|g| g.count).sum();
    assert_eq!(total, reports.len());
    assert_eq!(analysis.groups.len(), 4);
    assert!(analysis.groups.iter().any(|g| g.waste_type == UNKNOWN_WASTE_TYPE && g.count == 1));
  }

  #[test]
  fn test_dominant_tie_breaks_on_severity() {
    let reports = vec![
      typed_report(1, "Organic", 2.0),
      typed_report(2, "Organic", 3.0),
      typed_report(3, "Plastic", 8.0),
      typed_report(4, "Plastic", 9.0),
    ];

    let analysis = analyze(&reports);

    let dominant = analysis.dominant().unwrap();
    assert_eq!(dominant.waste_type, "Plastic");
    assert_eq!(dominant.count, 2);
    assert!((dominant.avg_severity - 8.5).abs() < 1e-9);

    let severe: Vec<&str> = analysis.high_severity().map(|g| g.waste_type.as_str()).collect();
    assert_eq!(severe, vec!["Plastic"]);
  }

  #[test]
  fn test_locations_are_distinct_and_non_empty() {
    let mut first = typed_report(1, "Glass", 4.0);
    first.address_text = Some("Becora".to_string());
    let mut second = typed_report(2, "Glass", 4.0);
    second.address_text = Some("Becora".to_string());
    let mut third = typed_report(3, "Glass", 4.0);
    third.address_text = Some("  ".to_string());
    let mut fourth = typed_report(4, "Glass", 4.0);
    fourth.address_text = Some("Comoro".to_string());

    let analysis = analyze(&[first, second, third, fourth]);

    assert_eq!(analysis.groups[0].locations, vec!["Becora".to_string(), "Comoro".to_string()]);
  }

  #[test]
  fn test_missing_scores_count_as_zero() {
    let mut quiet = typed_report(1, "Paper", 6.0);
    quiet.confidence_score = None;
    let mut loud = typed_report(2, "Paper", 6.0);
    loud.confidence_score = Some(90.0);

    let analysis = analyze(&[quiet, loud]);

    assert!((analysis.groups[0].avg_confidence - 45.0).abs() < 1e-9);
  }
}
