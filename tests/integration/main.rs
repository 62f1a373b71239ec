//! Integration tests: sources → orchestrator → dashboard, in-process.

mod pipeline;
mod stub_source;
