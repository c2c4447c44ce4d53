use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use trowgc_catalog::{CatalogSummary, ReapOutcome, Referrer};
use trowgc_types::Digest;

use crate::phase::PhaseTiming;

/// Time-ordered identifier of one cycle (UUID v7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CycleId(uuid::Uuid);

impl CycleId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 characters, for log lines.
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CycleId({})", self.short_id())
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recoverable condition observed during a cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// `referrer` names a blob that is not on disk.
    DanglingReference { referrer: Referrer, digest: Digest },
    /// A file under the blob directory whose name is not a digest. It is
    /// left alone.
    UnrecognizedBlobFile { path: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference { referrer, digest } => {
                write!(f, "{referrer} points to blob {digest} which doesn't exist on disk")
            }
            Self::UnrecognizedBlobFile { path } => {
                write!(f, "ignoring {path}: file name is not a digest")
            }
        }
    }
}

/// Everything a finished cycle reports.
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub id: CycleId,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Aggregate taken in the SUMMARY phase, after reaping.
    pub summary: CatalogSummary,
    pub reap: ReapOutcome,
    pub warnings: Vec<Warning>,
    pub timings: Vec<PhaseTiming>,
}

impl CycleReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
