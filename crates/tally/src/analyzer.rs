//! Batch analyzer: fetch, analyze, recommend, assemble
//!
//! One call to [`BatchAnalyzer::analyze`] is one request-scoped run. The
//! store session is opened on entry and closed on every exit path once it
//! exists. The whole run, connection included, is bounded by a timeout and
//! either returns a complete response or an error, never a partial result.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::anomaly::{self, AnomalyAnalysis};
use crate::distance::compute_distance_matrix;
use crate::error::AnalysisError;
use crate::fetch::fetch_batch;
use crate::patterns::{self, PatternAnalysis};
use crate::recommendations;
use crate::report::ReportRecord;
use crate::request::{AnalysisType, BatchRequest};
use crate::response::{self, BatchAnalysisResponse};
use crate::similarity::{self, SimilarityAnalysis};
use crate::store::{ReportSession, ReportStore};

pub const DEFAULT_DISTANCE_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output of whichever analysis ran
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
  Similarity(SimilarityAnalysis),
  Patterns(PatternAnalysis),
  Anomaly(AnomalyAnalysis),
}

impl AnalysisOutcome {
  pub fn analysis_type(&self) -> AnalysisType {
    match self {
      Self::Similarity(_) => AnalysisType::Similarity,
      Self::Patterns(_) => AnalysisType::Patterns,
      Self::Anomaly(_) => AnalysisType::Anomaly,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
  /// Maximum in-flight distance calls during similarity analysis
  pub distance_concurrency: usize,
  /// Budget for opening the session, fetch and analysis
  pub timeout: Duration,
}

impl Default for AnalyzerOptions {
  fn default() -> Self {
    Self { distance_concurrency: DEFAULT_DISTANCE_CONCURRENCY, timeout: DEFAULT_TIMEOUT }
  }
}

pub struct BatchAnalyzer {
  store: Arc<dyn ReportStore>,
  options: AnalyzerOptions,
}

impl BatchAnalyzer {
  pub fn new(store: Arc<dyn ReportStore>, options: AnalyzerOptions) -> Self {
    Self { store, options }
  }

  /// Run one validated batch request end to end
  pub async fn analyze(&self, request: &BatchRequest) -> Result<BatchAnalysisResponse, AnalysisError> {
    // One deadline covers connecting, fetching and analysis.
    let deadline = Instant::now() + self.options.timeout;

    let session = match timeout_at(deadline, self.store.open_session()).await {
      Ok(session) => session?,
      Err(_) => return Err(self.timed_out(request)),
    };

    let run = timeout_at(deadline, self.run(session.as_ref(), request)).await;
    session.close().await;

    let (reports, outcome) = match run {
      Ok(result) => result?,
      Err(_) => return Err(self.timed_out(request)),
    };

    let recommendations = recommendations::recommend(&reports, &outcome);
    Ok(response::assemble(&reports, outcome, recommendations, Utc::now()))
  }

  fn timed_out(&self, request: &BatchRequest) -> AnalysisError {
    tracing::warn!(
      analysis_type = %request.analysis_type(),
      budget_ms = self.options.timeout.as_millis() as u64,
      "batch analysis timed out"
    );
    AnalysisError::Timeout { budget: self.options.timeout }
  }

  async fn run(
    &self,
    session: &dyn ReportSession,
    request: &BatchRequest,
  ) -> Result<(Vec<ReportRecord>, AnalysisOutcome), AnalysisError> {
    let reports = fetch_batch(session, request).await?;

    let outcome = match request.analysis_type() {
      AnalysisType::Similarity => {
        let matrix =
          compute_distance_matrix(session, &reports, self.options.distance_concurrency).await?;
        AnalysisOutcome::Similarity(similarity::analyze(&reports, matrix))
      }
      AnalysisType::Patterns => AnalysisOutcome::Patterns(patterns::analyze(&reports)),
      AnalysisType::Anomaly => AnalysisOutcome::Anomaly(anomaly::analyze(&reports)),
    };

    tracing::info!(
      analysis_type = %request.analysis_type(),
      reports = reports.len(),
      "batch analysis completed"
    );

    Ok((reports, outcome))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::StoreError;
  use crate::response::CommonPattern;
  use crate::store::MockReportSession;
  use crate::testing::report_at;
  use async_trait::async_trait;
  use std::sync::Mutex;

  /// Hands out a single prepared mock session
  struct OneShotStore {
    session: Mutex<Option<MockReportSession>>,
  }

  impl OneShotStore {
    fn new(session: MockReportSession) -> Arc<Self> {
      Arc::new(Self { session: Mutex::new(Some(session)) })
    }
  }

  #[async_trait]
  impl ReportStore for OneShotStore {
    async fn open_session(&self) -> Result<Box<dyn ReportSession>, StoreError> {
      let session = self.session.lock().unwrap().take().expect("session already taken");
      Ok(Box::new(session))
    }
  }

  /// Takes longer to connect than any test budget allows
  struct SlowConnectStore;

  #[async_trait]
  impl ReportStore for SlowConnectStore {
    async fn open_session(&self) -> Result<Box<dyn ReportSession>, StoreError> {
      tokio::time::sleep(Duration::from_millis(500)).await;
      Ok(Box::new(MockReportSession::new()))
    }
  }

  #[tokio::test]
  async fn test_slow_connection_counts_against_the_budget() {
    let options = AnalyzerOptions { timeout: Duration::from_millis(30), ..AnalyzerOptions::default() };
    let analyzer = BatchAnalyzer::new(Arc::new(SlowConnectStore), options);
    let request = BatchRequest::new(vec![1, 2], AnalysisType::Patterns).unwrap();

    let err = analyzer.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Timeout { .. }));
  }

  #[tokio::test]
  async fn test_repeated_rows_are_analyzed_once() {
    let mut session = MockReportSession::new();
    session
      .expect_fetch_reports()
      .returning(|_| Ok(vec![report_at(1, 10), report_at(2, 20), report_at(1, 10)]));
    session.expect_cosine_distance().times(1).returning(|_, _| Ok(0.05));
    session.expect_close().times(1).return_const(());

    let analyzer = BatchAnalyzer::new(OneShotStore::new(session), AnalyzerOptions::default());
    let request = BatchRequest::new(vec![1, 2], AnalysisType::Similarity).unwrap();

    let response = analyzer.analyze(&request).await.unwrap();
    assert_eq!(response.reports_analyzed, 2);
    assert_eq!(response.results.similarity_matrix.len(), 2);
    match &response.results.common_patterns[..] {
      [CommonPattern::Pair(pair)] => assert_ne!(pair.report_1.report_id, pair.report_2.report_id),
      other => panic!("expected one pair, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_session_closed_after_success() {
    let mut session = MockReportSession::new();
    session.expect_fetch_reports().returning(|_| Ok(vec![report_at(1, 10), report_at(2, 20)]));
    session.expect_cosine_distance().times(1).returning(|_, _| Ok(0.05));
    session.expect_close().times(1).return_const(());

    let analyzer = BatchAnalyzer::new(OneShotStore::new(session), AnalyzerOptions::default());
    let request = BatchRequest::new(vec![1, 2], AnalysisType::Similarity).unwrap();

    let response = analyzer.analyze(&request).await.unwrap();
    assert_eq!(response.reports_analyzed, 2);
    assert_eq!(response.results.common_patterns.len(), 1);
  }

  #[tokio::test]
  async fn test_session_closed_after_store_failure() {
    let mut session = MockReportSession::new();
    session.expect_fetch_reports().returning(|_| Ok(vec![report_at(1, 10), report_at(2, 20)]));
    session.expect_cosine_distance().returning(|_, _| Err(StoreError::query("vector function missing")));
    session.expect_close().times(1).return_const(());

    let analyzer = BatchAnalyzer::new(OneShotStore::new(session), AnalyzerOptions::default());
    let request = BatchRequest::new(vec![1, 2], AnalysisType::Similarity).unwrap();

    let err = analyzer.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Store(_)));
  }

  #[tokio::test]
  async fn test_patterns_never_compute_distances() {
    let mut session = MockReportSession::new();
    session.expect_fetch_reports().returning(|_| Ok(vec![report_at(1, 10), report_at(2, 20)]));
    session.expect_cosine_distance().times(0);
    session.expect_close().times(1).return_const(());

    let analyzer = BatchAnalyzer::new(OneShotStore::new(session), AnalyzerOptions::default());
    let request = BatchRequest::new(vec![1, 2], AnalysisType::Patterns).unwrap();

    let response = analyzer.analyze(&request).await.unwrap();
    assert!(response.results.similarity_matrix.is_empty());
    assert_eq!(response.analysis_type, AnalysisType::Patterns);
  }
}
