use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

use tally::report::WasteType;
use tally::response::CommonPattern;
use tally::{
  AnalysisError, AnalysisType, AnalyzerOptions, BatchAnalyzer, BatchRequest, Embedding,
  InMemoryReportStore, ReportRecord,
};

fn record(id: i64, embedding: Vec<f32>) -> ReportRecord {
  let date = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + ChronoDuration::hours(id);
  ReportRecord::new(id, Embedding::new(embedding).unwrap(), date)
}

fn typed(id: i64, waste_type: &str, severity: f64) -> ReportRecord {
  let mut report = record(id, vec![1.0, 0.0]);
  report.waste_type =
    Some(WasteType { name: waste_type.to_string(), recyclable: Some(true), hazard_level: None });
  report.severity_score = Some(severity);
  report.confidence_score = Some(85.0);
  report.estimated_volume = Some(1.5);
  report
}

fn analyzer(store: &InMemoryReportStore) -> BatchAnalyzer {
  BatchAnalyzer::new(Arc::new(store.clone()), AnalyzerOptions::default())
}

fn request(ids: &[i64], analysis_type: AnalysisType) -> BatchRequest {
  BatchRequest::new(ids.to_vec(), analysis_type).unwrap()
}

#[tokio::test]
async fn test_similarity_pairs_close_reports_and_flags_the_odd_one() {
  let store = InMemoryReportStore::new(vec![
    record(1, vec![1.0, 0.0]),
    record(2, vec![1.0, 0.1]),
    record(3, vec![0.0, 1.0]),
  ])
  .with_distance(1, 2, 0.1)
  .with_distance(1, 3, 0.9)
  .with_distance(2, 3, 0.9);

  let response = analyzer(&store).analyze(&request(&[1, 2, 3], AnalysisType::Similarity)).await.unwrap();

  assert!(response.success);
  assert_eq!(response.reports_analyzed, 3);
  assert_eq!(response.results.common_patterns.len(), 1);
  match &response.results.common_patterns[0] {
    CommonPattern::Pair(pair) => {
      let mut ids = [pair.report_1.report_id, pair.report_2.report_id];
      ids.sort();
      assert_eq!(ids, [1, 2]);
      assert!((pair.similarity_score - 0.9).abs() < 1e-9);
    }
    other => panic!("expected a pair pattern, got {other:?}"),
  }
  assert_eq!(response.results.outliers[0].report.report_id, 3);
  assert_eq!(store.counters().distance_calls(), 3);
}

#[tokio::test]
async fn test_similarity_matrix_is_symmetric_with_unit_diagonal() {
  let reports: Vec<ReportRecord> =
    (1..=7).map(|id| record(id, vec![1.0, id as f32 * 0.3, (id % 3) as f32])).collect();
  let store = InMemoryReportStore::new(reports);

  let ids: Vec<i64> = (1..=7).collect();
  let response = analyzer(&store).analyze(&request(&ids, AnalysisType::Similarity)).await.unwrap();

  let matrix = &response.results.similarity_matrix;
  assert_eq!(matrix.len(), 7);
  for i in 0..7 {
    assert_eq!(matrix[i].len(), 7);
    assert_eq!(matrix[i][i], 1.0);
    for j in 0..7 {
      assert_eq!(matrix[i][j], matrix[j][i]);
      assert!((0.0..=1.0).contains(&matrix[i][j]));
    }
  }
  // One distance call per unordered pair
  assert_eq!(store.counters().distance_calls(), 21);
}

#[tokio::test]
async fn test_matrix_is_independent_of_concurrency() {
  let reports: Vec<ReportRecord> =
    (1..=6).map(|id| record(id, vec![id as f32, 1.0, (7 - id) as f32])).collect();
  let ids: Vec<i64> = (1..=6).collect();

  let mut matrices = Vec::new();
  for width in [1, 4, 16] {
    let store = InMemoryReportStore::new(reports.clone()).with_distance_delay(Duration::from_millis(2));
    let options = AnalyzerOptions { distance_concurrency: width, ..AnalyzerOptions::default() };
    let response = BatchAnalyzer::new(Arc::new(store), options)
      .analyze(&request(&ids, AnalysisType::Similarity))
      .await
      .unwrap();
    matrices.push(response.results.similarity_matrix);
  }

  assert_eq!(matrices[0], matrices[1]);
  assert_eq!(matrices[1], matrices[2]);
}

#[tokio::test]
async fn test_patterns_split_plastic_and_organic() {
  let store = InMemoryReportStore::new(vec![
    typed(1, "plastic", 8.0),
    typed(2, "plastic", 9.0),
    typed(3, "organic", 2.0),
    typed(4, "organic", 3.0),
  ]);

  let response = analyzer(&store).analyze(&request(&[1, 2, 3, 4], AnalysisType::Patterns)).await.unwrap();

  assert_eq!(response.results.common_patterns.len(), 2);
  let total: usize = response
    .results
    .common_patterns
    .iter()
    .map(|pattern| match pattern {
      CommonPattern::Group(group) => group.count,
      CommonPattern::Pair(_) => 0,
    })
    .sum();
  assert_eq!(total, 4);

  let recommendations = &response.results.recommendations;
  assert!(recommendations[0].starts_with("plastic is the dominant waste type (2 reports)"));
  assert!(recommendations[1].contains("High severity waste types detected: plastic"));
  assert!(response.results.similarity_matrix.is_empty());
  assert_eq!(store.counters().distance_calls(), 0);
}

#[tokio::test]
async fn test_anomaly_flags_only_the_severity_spike() {
  let reports: Vec<ReportRecord> = [5.0, 5.0, 5.0, 5.0, 9.0]
    .iter()
    .enumerate()
    .map(|(i, severity)| typed(i as i64 + 1, "mixed", *severity))
    .collect();
  let store = InMemoryReportStore::new(reports);

  let response =
    analyzer(&store).analyze(&request(&[1, 2, 3, 4, 5], AnalysisType::Anomaly)).await.unwrap();

  let outliers = &response.results.outliers;
  assert_eq!(outliers.len(), 1);
  assert_eq!(outliers[0].report.report_id, 5);
  assert!(outliers[0].anomaly_reason.contains("severity"));
  assert_eq!(outliers[0].anomaly_score, Some(1));
  assert!(response.results.common_patterns.is_empty());
}

#[tokio::test]
async fn test_metadata_covers_whole_batch() {
  let store = InMemoryReportStore::new(vec![
    typed(1, "plastic", 2.0),
    typed(2, "metal", 4.0),
    typed(3, "plastic", 6.0),
  ]);

  let response = analyzer(&store).analyze(&request(&[1, 2, 3], AnalysisType::Anomaly)).await.unwrap();

  let metadata = &response.metadata;
  assert_eq!(metadata.total_reports, 3);
  assert!((metadata.avg_severity - 4.0).abs() < 1e-9);
  assert!((metadata.avg_confidence - 85.0).abs() < 1e-9);
  assert_eq!(metadata.waste_types, vec!["plastic".to_string(), "metal".to_string()]);
  assert!(metadata.date_range.earliest < metadata.date_range.latest);
}

#[test]
fn test_invalid_batches_fail_before_store_access() {
  let store = InMemoryReportStore::new(vec![record(1, vec![1.0])]);

  assert!(matches!(
    BatchRequest::new(vec![1], AnalysisType::Similarity),
    Err(AnalysisError::Validation { .. })
  ));
  assert!(matches!(
    BatchRequest::new((1..=51).collect(), AnalysisType::Patterns),
    Err(AnalysisError::Validation { .. })
  ));

  assert!(!store.counters().touched());
}

#[tokio::test]
async fn test_every_analysis_shares_the_not_found_floor() {
  for analysis_type in [AnalysisType::Similarity, AnalysisType::Patterns, AnalysisType::Anomaly] {
    let store = InMemoryReportStore::new(vec![record(1, vec![1.0]), record(7, vec![0.5])]);

    let err = analyzer(&store).analyze(&request(&[1, 2, 3], analysis_type)).await.unwrap_err();

    assert!(matches!(err, AnalysisError::NotFound { .. }), "{analysis_type}: {err:?}");
    assert_eq!(store.counters().sessions_closed(), 1);
  }
}

#[tokio::test]
async fn test_timeout_returns_no_partial_result_and_closes_session() {
  let store = InMemoryReportStore::new((1..=5).map(|id| record(id, vec![1.0, id as f32])).collect())
    .with_distance_delay(Duration::from_millis(200));
  let options = AnalyzerOptions { distance_concurrency: 1, timeout: Duration::from_millis(50) };

  let err = BatchAnalyzer::new(Arc::new(store.clone()), options)
    .analyze(&request(&[1, 2, 3, 4, 5], AnalysisType::Similarity))
    .await
    .unwrap_err();

  assert!(matches!(err, AnalysisError::Timeout { .. }));
  assert_eq!(store.counters().sessions_opened(), 1);
  assert_eq!(store.counters().sessions_closed(), 1);
}

#[tokio::test]
async fn test_failed_distance_call_fails_the_whole_run() {
  let store =
    InMemoryReportStore::new(vec![record(1, vec![1.0]), record(2, vec![2.0])]).with_failing_distance();

  let err = analyzer(&store).analyze(&request(&[1, 2], AnalysisType::Similarity)).await.unwrap_err();

  assert!(matches!(err, AnalysisError::Store(_)));
  assert_eq!(err.code(), "INTERNAL_ERROR");
  assert_eq!(store.counters().sessions_closed(), 1);
}
