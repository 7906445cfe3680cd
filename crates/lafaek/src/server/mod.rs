//! REST API module for the batch analysis service
//!
//! Exposes the batch analyzer over HTTP. Uses axum for routing and schemars
//! for OpenAPI documentation generation.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod services;
pub mod startup;
pub mod types;
