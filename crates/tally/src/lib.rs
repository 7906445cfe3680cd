//! Tally - Batch Report Analysis
//!
//! Given a bounded batch of waste reports with precomputed image embeddings,
//! tally runs one of three analyses and wraps the result with run metadata:
//!
//! - **similarity**: pairwise similarity matrix, highly similar pairs and
//!   the reports least like the rest of the batch
//! - **patterns**: per-waste-type aggregates
//! - **anomaly**: reports whose scores stray from the batch mean
//!
//! Storage and the vector-distance primitive live behind [`ReportStore`].

pub mod analyzer;
pub mod anomaly;
pub mod distance;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod patterns;
pub mod recommendations;
pub mod report;
pub mod request;
pub mod response;
pub mod similarity;
pub mod store;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalysisOutcome, AnalyzerOptions, BatchAnalyzer};
pub use error::{AnalysisError, StoreError};
pub use memory::InMemoryReportStore;
pub use report::{Embedding, ReportRecord, ReportSummary};
pub use request::{AnalysisType, BatchAnalysisRequest, BatchRequest};
pub use response::BatchAnalysisResponse;
pub use store::{ReportSession, ReportStore};
