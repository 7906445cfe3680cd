//! Lafaek - batch report analysis over HTTP
//!
//! The `server` module hosts the REST API backed by TiDB; the `cli` module
//! is a thin client for it.

pub mod cli;
pub mod server;
