//! Pairwise distance computation
//!
//! Distances are kept in store convention (cosine distance, 0 = identical)
//! inside [`DistanceMatrix`]. Conversion to similarity happens once, via
//! [`similarity_from_distance`], when results are assembled.

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::StoreError;
use crate::report::ReportRecord;
use crate::store::ReportSession;

/// Convert a cosine distance into a similarity in [0, 1]
pub fn similarity_from_distance(distance: f64) -> f64 {
  (1.0 - distance).clamp(0.0, 1.0)
}

/// Cosine distance between two vectors, clamped to [0, 1]
///
/// Mismatched dimensions or zero-magnitude vectors are treated as
/// maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
  if a.len() != b.len() || a.is_empty() {
    return 1.0;
  }

  let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
  let magnitude_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
  let magnitude_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    return 1.0;
  }

  (1.0 - dot_product / (magnitude_a * magnitude_b)).clamp(0.0, 1.0)
}

/// Symmetric n x n matrix of cosine distances with a zero diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
  size: usize,
  values: Vec<f64>,
}

impl DistanceMatrix {
  /// Matrix in which every report is identical to itself and, until set,
  /// to every other report
  pub fn new(size: usize) -> Self {
    Self { size, values: vec![0.0; size * size] }
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn get(&self, i: usize, j: usize) -> f64 {
    self.values[i * self.size + j]
  }

  /// Set both (i, j) and (j, i); diagonal entries stay fixed at zero
  pub fn set_pair(&mut self, i: usize, j: usize, distance: f64) {
    if i == j {
      return;
    }
    let distance = distance.clamp(0.0, 1.0);
    self.values[i * self.size + j] = distance;
    self.values[j * self.size + i] = distance;
  }

  /// Upper-triangle pairs (i < j) with their distance
  pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
    (0..self.size).flat_map(move |i| ((i + 1)..self.size).map(move |j| (i, j, self.get(i, j))))
  }

  /// Mean similarity of report `i` to every other report in the batch
  pub fn mean_similarity_to_others(&self, i: usize) -> f64 {
    if self.size < 2 {
      return 1.0;
    }
    let total: f64 =
      (0..self.size).filter(|&j| j != i).map(|j| similarity_from_distance(self.get(i, j))).sum();
    total / (self.size - 1) as f64
  }

  /// Row-major similarity matrix with a unit diagonal
  pub fn to_similarity_rows(&self) -> Vec<Vec<f64>> {
    (0..self.size)
      .map(|i| (0..self.size).map(|j| similarity_from_distance(self.get(i, j))).collect())
      .collect()
  }
}

/// Evaluate every unordered pair through the session with bounded
/// concurrency. Results are written by index, so completion order does not
/// affect the matrix. The first failed call fails the whole computation.
pub async fn compute_distance_matrix(
  session: &dyn ReportSession,
  reports: &[ReportRecord],
  concurrency: usize,
) -> Result<DistanceMatrix, StoreError> {
  let size = reports.len();
  let pairs: Vec<(usize, usize)> =
    (0..size).flat_map(|i| ((i + 1)..size).map(move |j| (i, j))).collect();

  tracing::debug!(reports = size, pairs = pairs.len(), concurrency, "computing distance matrix");

  let distances: Vec<(usize, usize, f64)> = stream::iter(pairs)
    .map(|(i, j)| async move {
      let distance = session.cosine_distance(&reports[i], &reports[j]).await?;
      if !distance.is_finite() {
        return Err(StoreError::decode(format!(
          "non-finite distance between reports {} and {}",
          reports[i].report_id, reports[j].report_id
        )));
      }
      Ok::<_, StoreError>((i, j, distance))
    })
    .buffer_unordered(concurrency.max(1))
    .try_collect()
    .await?;

  let mut matrix = DistanceMatrix::new(size);
  for (i, j, distance) in distances {
    matrix.set_pair(i, j, distance);
  }
  Ok(matrix)
}
