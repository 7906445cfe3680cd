//! Thin command-line client for the batch analysis server

pub mod client;
pub mod commands;
pub mod display;
