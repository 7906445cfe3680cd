//! Record fetch step

use std::collections::HashSet;

use crate::error::AnalysisError;
use crate::report::ReportRecord;
use crate::request::{BatchRequest, MIN_BATCH_SIZE};
use crate::store::ReportSession;

pub const INSUFFICIENT_REPORTS: &str = "Insufficient reports found with embeddings";

/// Load the batch's reports, newest first, enforcing the two-record floor
/// shared by every analysis type.
pub async fn fetch_batch(
  session: &dyn ReportSession,
  request: &BatchRequest,
) -> Result<Vec<ReportRecord>, AnalysisError> {
  let mut reports = session.fetch_reports(request.report_ids()).await?;

  // Backends filter on embedding presence; keep only requested ids in case
  // a backend returns extra rows.
  reports.retain(|report| request.report_ids().contains(&report.report_id));
  reports.sort_by(|a, b| b.report_date.cmp(&a.report_date));

  // Joined rows can repeat a report; the first (newest) copy stays.
  let mut seen = HashSet::new();
  reports.retain(|report| seen.insert(report.report_id));

  tracing::debug!(
    requested = request.report_ids().len(),
    found = reports.len(),
    "fetched batch reports"
  );

  if reports.len() < MIN_BATCH_SIZE {
    return Err(AnalysisError::not_found(INSUFFICIENT_REPORTS));
  }

  Ok(reports)
}
