//! TiDB-backed report store
//!
//! Reports are read over the MySQL wire protocol with sqlx. Cosine distance
//! is computed by TiDB's vector functions so embeddings never need to be
//! compared in process. Each analysis run gets its own small pool, closed
//! when the run ends.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;

use tally::report::{ReportStatus, WasteType};
use tally::{Embedding, ReportRecord, ReportSession, ReportStore, StoreError};

use crate::server::config::ServiceConfig;

const REPORT_COLUMNS: &str = "SELECT \
  CAST(r.report_id AS SIGNED) AS report_id, \
  CAST(r.latitude AS DOUBLE) AS latitude, \
  CAST(r.longitude AS DOUBLE) AS longitude, \
  r.address_text, \
  r.description, \
  r.report_date, \
  CAST(r.status AS CHAR) AS status, \
  r.image_url, \
  VEC_AS_TEXT(ar.image_embedding) AS image_embedding, \
  VEC_AS_TEXT(ar.location_embedding) AS location_embedding, \
  ar.full_description, \
  CAST(ar.confidence_score AS DOUBLE) AS confidence_score, \
  CAST(ar.severity_score AS DOUBLE) AS severity_score, \
  CAST(ar.priority_level AS CHAR) AS priority_level, \
  CAST(ar.estimated_volume AS DOUBLE) AS estimated_volume, \
  wt.name AS waste_type, \
  wt.recyclable, \
  CAST(wt.hazard_level AS CHAR) AS hazard_level, \
  u.username \
  FROM reports r \
  JOIN analysis_results ar ON r.report_id = ar.report_id \
  LEFT JOIN waste_types wt ON ar.waste_type_id = wt.waste_type_id \
  LEFT JOIN users u ON r.user_id = u.user_id \
  WHERE ar.image_embedding IS NOT NULL AND r.report_id IN (";

const COSINE_DISTANCE_QUERY: &str =
  "SELECT VEC_COSINE_DISTANCE(VEC_FROM_TEXT(?), VEC_FROM_TEXT(?)) AS distance";

/// Opens one pooled session per analysis run
pub struct TidbReportStore {
  options: MySqlConnectOptions,
  max_connections: u32,
}

impl TidbReportStore {
  /// Pool size matches the distance fan-out
  pub fn new(config: &ServiceConfig) -> Self {
    let database = &config.database;
    let options = MySqlConnectOptions::new()
      .host(&database.host)
      .port(database.port)
      .username(&database.user)
      .password(&database.password)
      .database(&database.name)
      .ssl_mode(ssl_mode(config.require_verified_tls()));

    Self { options, max_connections: config.analysis.distance_concurrency.max(1) as u32 }
  }
}

/// Verified connections check the server certificate; the rest only encrypt
fn ssl_mode(verified: bool) -> MySqlSslMode {
  if verified {
    MySqlSslMode::VerifyIdentity
  } else {
    MySqlSslMode::Required
  }
}

#[async_trait]
impl ReportStore for TidbReportStore {
  async fn open_session(&self) -> Result<Box<dyn ReportSession>, StoreError> {
    let pool = MySqlPoolOptions::new()
      .max_connections(self.max_connections)
      .connect_with(self.options.clone())
      .await
      .map_err(|e| StoreError::connection(e.to_string()))?;

    Ok(Box::new(TidbSession { pool }))
  }
}

struct TidbSession {
  pool: MySqlPool,
}

#[async_trait]
impl ReportSession for TidbSession {
  async fn fetch_reports(&self, report_ids: &[i64]) -> Result<Vec<ReportRecord>, StoreError> {
    if report_ids.is_empty() {
      return Ok(Vec::new());
    }

    let mut query = fetch_query(report_ids);
    let rows = query
      .build()
      .fetch_all(&self.pool)
      .await
      .map_err(|e| StoreError::query(e.to_string()))?;

    rows.iter().map(decode_report).collect()
  }

  async fn cosine_distance(&self, left: &ReportRecord, right: &ReportRecord) -> Result<f64, StoreError> {
    let distance: Option<f64> = sqlx::query_scalar(COSINE_DISTANCE_QUERY)
      .bind(left.image_embedding.to_text())
      .bind(right.image_embedding.to_text())
      .fetch_one(&self.pool)
      .await
      .map_err(|e| StoreError::query(e.to_string()))?;

    distance.ok_or_else(|| {
      StoreError::decode(format!(
        "no cosine distance between reports {} and {}",
        left.report_id, right.report_id
      ))
    })
  }

  async fn close(&self) {
    self.pool.close().await;
  }
}

fn fetch_query(report_ids: &[i64]) -> QueryBuilder<'static, MySql> {
  let mut query = QueryBuilder::new(REPORT_COLUMNS);
  let mut ids = query.separated(", ");
  for id in report_ids {
    ids.push_bind(*id);
  }
  query.push(") ORDER BY r.report_date DESC");
  query
}

fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, StoreError>
where
  T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
  row.try_get(name).map_err(|e| StoreError::decode(format!("column {name}: {e}")))
}

/// Parse an optional text label into its enum
fn label<T>(name: &str, value: Option<String>) -> Result<Option<T>, StoreError>
where
  T: FromStr<Err = String>,
{
  match value {
    None => Ok(None),
    Some(text) if text.trim().is_empty() => Ok(None),
    Some(text) => text.parse().map(Some).map_err(|e| StoreError::decode(format!("column {name}: {e}"))),
  }
}

fn embedding(name: &str, value: Option<String>) -> Result<Option<Embedding>, StoreError> {
  value
    .map(|text| Embedding::parse_text(&text).map_err(|e| StoreError::decode(format!("column {name}: {e}"))))
    .transpose()
}

fn decode_report(row: &MySqlRow) -> Result<ReportRecord, StoreError> {
  let report_id: i64 = column(row, "report_id")?;
  let report_date: NaiveDateTime = column(row, "report_date")?;
  let image_embedding = embedding("image_embedding", column(row, "image_embedding")?)?
    .ok_or_else(|| StoreError::decode(format!("report {report_id} has no image embedding")))?;

  let status: Option<ReportStatus> = label("status", column(row, "status")?)?;
  let waste_type = column::<Option<String>>(row, "waste_type")?.map(|name| -> Result<_, StoreError> {
    Ok(WasteType {
      name,
      recyclable: column(row, "recyclable")?,
      hazard_level: label("hazard_level", column(row, "hazard_level")?)?,
    })
  });

  let mut record = ReportRecord::new(report_id, image_embedding, report_date.and_utc());
  record.latitude = column::<Option<f64>>(row, "latitude")?.unwrap_or_default();
  record.longitude = column::<Option<f64>>(row, "longitude")?.unwrap_or_default();
  record.address_text = column(row, "address_text")?;
  record.description = column(row, "description")?;
  record.status = status.unwrap_or(record.status);
  record.image_url = column(row, "image_url")?;
  record.location_embedding = embedding("location_embedding", column(row, "location_embedding")?)?;
  record.full_description = column(row, "full_description")?;
  record.confidence_score = column(row, "confidence_score")?;
  record.severity_score = column(row, "severity_score")?;
  record.estimated_volume = column(row, "estimated_volume")?;
  record.priority_level = label("priority_level", column(row, "priority_level")?)?;
  record.waste_type = waste_type.transpose()?;
  record.username = column(row, "username")?;
  Ok(record)
}
