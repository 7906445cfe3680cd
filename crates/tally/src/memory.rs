//! In-memory report store
//!
//! Computes cosine distance locally instead of in the database. Every
//! session shares a set of call counters so callers can assert how the
//! store was used.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::distance::cosine_distance;
use crate::error::StoreError;
use crate::report::ReportRecord;
use crate::store::{ReportSession, ReportStore};

/// Usage counters shared by a store and all of its sessions
#[derive(Debug, Default)]
pub struct StoreCounters {
  sessions_opened: AtomicUsize,
  sessions_closed: AtomicUsize,
  fetches: AtomicUsize,
  distance_calls: AtomicUsize,
}

impl StoreCounters {
  pub fn sessions_opened(&self) -> usize {
    self.sessions_opened.load(Ordering::SeqCst)
  }

  pub fn sessions_closed(&self) -> usize {
    self.sessions_closed.load(Ordering::SeqCst)
  }

  pub fn fetches(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }

  pub fn distance_calls(&self) -> usize {
    self.distance_calls.load(Ordering::SeqCst)
  }

  /// Any access at all, including opening a session
  pub fn touched(&self) -> bool {
    self.sessions_opened() > 0
  }
}

#[derive(Debug, Clone, Default)]
struct Behaviour {
  distance_overrides: HashMap<(i64, i64), f64>,
  distance_delay: Duration,
  failing_distance: bool,
  unavailable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryReportStore {
  reports: Arc<Vec<ReportRecord>>,
  behaviour: Arc<Behaviour>,
  counters: Arc<StoreCounters>,
}

fn pair_key(a: i64, b: i64) -> (i64, i64) {
  if a <= b {
    (a, b)
  } else {
    (b, a)
  }
}

impl InMemoryReportStore {
  pub fn new(reports: Vec<ReportRecord>) -> Self {
    Self { reports: Arc::new(reports), ..Self::default() }
  }

  /// Pin the distance between two reports instead of computing it
  pub fn with_distance(mut self, a: i64, b: i64, distance: f64) -> Self {
    Arc::make_mut(&mut self.behaviour).distance_overrides.insert(pair_key(a, b), distance);
    self
  }

  /// Delay every distance call
  pub fn with_distance_delay(mut self, delay: Duration) -> Self {
    Arc::make_mut(&mut self.behaviour).distance_delay = delay;
    self
  }

  /// Make every distance call fail
  pub fn with_failing_distance(mut self) -> Self {
    Arc::make_mut(&mut self.behaviour).failing_distance = true;
    self
  }

  /// Refuse to open sessions
  pub fn unavailable(mut self) -> Self {
    Arc::make_mut(&mut self.behaviour).unavailable = true;
    self
  }

  pub fn counters(&self) -> Arc<StoreCounters> {
    self.counters.clone()
  }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
  async fn open_session(&self) -> Result<Box<dyn ReportSession>, StoreError> {
    self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
    if self.behaviour.unavailable {
      return Err(StoreError::connection("in-memory store marked unavailable"));
    }
    Ok(Box::new(InMemorySession {
      reports: self.reports.clone(),
      behaviour: self.behaviour.clone(),
      counters: self.counters.clone(),
    }))
  }
}

struct InMemorySession {
  reports: Arc<Vec<ReportRecord>>,
  behaviour: Arc<Behaviour>,
  counters: Arc<StoreCounters>,
}

#[async_trait]
impl ReportSession for InMemorySession {
  async fn fetch_reports(&self, report_ids: &[i64]) -> Result<Vec<ReportRecord>, StoreError> {
    self.counters.fetches.fetch_add(1, Ordering::SeqCst);

    let mut found: Vec<ReportRecord> =
      self.reports.iter().filter(|r| report_ids.contains(&r.report_id)).cloned().collect();
    found.sort_by(|a, b| b.report_date.cmp(&a.report_date));
    Ok(found)
  }

  async fn cosine_distance(
    &self,
    left: &ReportRecord,
    right: &ReportRecord,
  ) -> Result<f64, StoreError> {
    self.counters.distance_calls.fetch_add(1, Ordering::SeqCst);

    if !self.behaviour.distance_delay.is_zero() {
      tokio::time::sleep(self.behaviour.distance_delay).await;
    }
    if self.behaviour.failing_distance {
      return Err(StoreError::query("VEC_COSINE_DISTANCE unavailable"));
    }

    let key = pair_key(left.report_id, right.report_id);
    Ok(match self.behaviour.distance_overrides.get(&key) {
      Some(distance) => *distance,
      None => cosine_distance(left.image_embedding.as_slice(), right.image_embedding.as_slice()),
    })
  }

  async fn close(&self) {
    self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::report_at;

  #[tokio::test]
  async fn test_fetch_filters_and_orders() {
    let store = InMemoryReportStore::new(vec![report_at(1, 5), report_at(2, 50), report_at(3, 25)]);
    let session = store.open_session().await.unwrap();

    let found = session.fetch_reports(&[1, 2]).await.unwrap();
    let ids: Vec<i64> = found.iter().map(|r| r.report_id).collect();
    assert_eq!(ids, vec![2, 1]);

    session.close().await;
    let counters = store.counters();
    assert_eq!(counters.fetches(), 1);
    assert_eq!(counters.sessions_opened(), counters.sessions_closed());
  }

  #[tokio::test]
  async fn test_distance_override_is_order_independent() {
    let store = InMemoryReportStore::new(vec![report_at(1, 1), report_at(2, 2)]).with_distance(2, 1, 0.42);
    let session = store.open_session().await.unwrap();

    let a = report_at(1, 1);
    let b = report_at(2, 2);
    assert_eq!(session.cosine_distance(&a, &b).await.unwrap(), 0.42);
    assert_eq!(session.cosine_distance(&b, &a).await.unwrap(), 0.42);
    assert_eq!(store.counters().distance_calls(), 2);
  }

  #[tokio::test]
  async fn test_unavailable_store_refuses_sessions() {
    let store = InMemoryReportStore::default().unavailable();
    assert!(store.open_session().await.is_err());
    assert!(store.counters().touched());
  }
}
