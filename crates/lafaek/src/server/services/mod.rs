//! Report store backends used by the server

pub mod tidb;
