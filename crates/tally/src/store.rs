//! Report store abstraction
//!
//! The analyzer never talks to a database directly. A [`ReportStore`] hands
//! out one [`ReportSession`] per analysis run; the session owns whatever
//! connection the backend needs and is closed by the analyzer on every exit
//! path. Backends supply the vector-distance primitive, so TiDB's
//! `VEC_COSINE_DISTANCE` and the in-memory store are interchangeable.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::report::ReportRecord;

/// Factory for request-scoped store sessions
#[async_trait]
pub trait ReportStore: Send + Sync {
  /// Acquire a session for a single analysis run
  async fn open_session(&self) -> Result<Box<dyn ReportSession>, StoreError>;
}

/// A request-scoped handle on the backing store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSession: Send + Sync {
  /// Fetch reports with a non-null image embedding, newest first
  async fn fetch_reports(&self, report_ids: &[i64]) -> Result<Vec<ReportRecord>, StoreError>;

  /// Cosine distance between two reports' image embeddings (0 = identical)
  async fn cosine_distance(
    &self,
    left: &ReportRecord,
    right: &ReportRecord,
  ) -> Result<f64, StoreError>;

  /// Release the session's resources
  async fn close(&self);
}
