//! Request context and middleware for the lafaek REST API
//!
//! Every request gets a context carrying a fresh request id and the request
//! line. Handlers pull it from the request extensions and use the id as the
//! transaction id of their response.

use axum::{
  extract::Request,
  http::{HeaderName, HeaderValue, Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request context containing request metadata
#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub user_agent: Option<String>,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, user_agent: Option<String>) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, user_agent }
  }

  pub fn log_info(&self, message: &str) {
    tracing::info!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      "{message}"
    );
  }

  pub fn log_warn(&self, message: &str) {
    tracing::warn!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      "{message}"
    );
  }

  pub fn log_request_start(&self) {
    tracing::info!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      user_agent = self.user_agent.as_deref().unwrap_or("none"),
      "request started"
    );
  }

  pub fn log_request_complete(&self, status_code: u16, duration_ms: f64) {
    tracing::info!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      status = status_code,
      duration_ms,
      "request completed"
    );
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let user_agent = request
    .headers()
    .get(axum::http::header::USER_AGENT)
    .and_then(|value| value.to_str().ok())
    .map(str::to_string);
  let context = RequestContext::new(request.method().clone(), request.uri().clone(), user_agent);

  let start_time = Instant::now();
  context.log_request_start();

  request.extensions_mut().insert(context.clone());
  let mut response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  context.log_request_complete(response.status().as_u16(), duration_ms);

  if let Ok(value) = HeaderValue::from_str(&context.request_id.to_string()) {
    response.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
  }

  response
}
