//! ODDSEDGE: multi-bookmaker odds aggregation and value-signal feed
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod sources;
pub mod engine;
pub mod dashboard;
