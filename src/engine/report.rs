//! Per-cycle diagnostics.
//!
//! Describes what each source contributed to the last completed cycle.
//! Served on `/api/sources`; never part of the published snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed,
}

/// Outcome of one source's fetch within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub status: SourceStatus,
    /// Records kept after sanitization.
    pub matches: usize,
    /// Records dropped by sanitization.
    pub rejected: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    pub fn ok(source: impl Into<String>, matches: usize, rejected: usize, elapsed_ms: u64) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Ok,
            matches,
            rejected,
            elapsed_ms,
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Failed,
            matches: 0,
            rejected: 0,
            elapsed_ms,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle: u64,
    #[serde(rename = "startedAtIso")]
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub sources: Vec<SourceReport>,
    pub matches: usize,
    pub signals: usize,
}

impl CycleReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| !s.is_ok()).count()
    }
}
