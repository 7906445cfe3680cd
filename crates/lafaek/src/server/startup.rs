//! REST server startup and configuration

use anyhow::Result;
use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tally::BatchAnalyzer;

use crate::server::config::ServiceConfig;
use crate::server::routing::{create_router, AppState};
use crate::server::services::tidb::TidbReportStore;

/// Start the REST server against the configured TiDB store
pub async fn start_server(config: ServiceConfig) -> Result<()> {
  config.validate()?;

  let store = TidbReportStore::new(&config);
  let analyzer = BatchAnalyzer::new(Arc::new(store), config.analyzer_options());
  let state = AppState::new(analyzer, config.environment);

  tracing::info!(
    environment = %config.environment,
    database = ?config.database,
    distance_concurrency = config.analysis.distance_concurrency,
    timeout_secs = config.analysis.request_timeout_secs,
    "starting lafaek REST server"
  );

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(config.bind).await?;
  tracing::info!("server listening on {}", config.bind);

  serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  tracing::info!("server shutdown gracefully");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
}
