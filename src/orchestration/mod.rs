//! Scheduled batch jobs: daily pricing, settlement, quota reporting and the
//! delinquency sweep.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod jobs;
pub mod retry;

pub use jobs::BatchOrchestrator;
pub use retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Pricing,
    Settlement,
    Delinquency,
    Reports,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Pricing => "pricing",
            JobKind::Settlement => "settlement",
            JobKind::Delinquency => "delinquency",
            JobKind::Reports => "reports",
        };
        f.write_str(name)
    }
}

/// Outcome of one job run. Per-item failures land in `errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job: JobKind,
    pub reference_date: NaiveDate,
    pub total: usize,
    pub succeeded: usize,
    pub errors: Vec<String>,
    /// Alert lines raised by the run (delinquency only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<String>,
}

impl JobSummary {
    pub fn new(job: JobKind, reference_date: NaiveDate) -> Self {
        Self {
            job,
            reference_date,
            total: 0,
            succeeded: 0,
            errors: Vec::new(),
            alerts: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

/// Failure of a whole job run, as opposed to one of its items.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
