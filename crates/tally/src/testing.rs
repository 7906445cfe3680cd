//! Record builders shared by unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::report::{Embedding, ReportRecord, WasteType};

fn base_date() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn report(id: i64) -> ReportRecord {
  report_at(id, id)
}

/// Report submitted `minutes` after a fixed base date
pub fn report_at(id: i64, minutes: i64) -> ReportRecord {
  let embedding = Embedding::new(vec![1.0, id as f32, 0.5]).unwrap();
  ReportRecord::new(id, embedding, base_date() + Duration::minutes(minutes))
}

pub fn typed_report(id: i64, waste_type: &str, severity: f64) -> ReportRecord {
  let mut record = report(id);
  record.waste_type =
    Some(WasteType { name: waste_type.to_string(), recyclable: None, hazard_level: None });
  record.severity_score = Some(severity);
  record.confidence_score = Some(80.0);
  record
}

pub fn scored_report(id: i64, severity: f64, confidence: f64, volume: f64) -> ReportRecord {
  let mut record = report(id);
  record.severity_score = Some(severity);
  record.confidence_score = Some(confidence);
  record.estimated_volume = Some(volume);
  record
}
