use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trowgc_types::Digest;

/// Something that keeps a blob alive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Referrer {
    /// A manifest file, by its path. Keeps its target document alive.
    Manifest(String),
    /// An image document, by its digest. Keeps its config and layers alive.
    Document(Digest),
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(name) => write!(f, "manifest {name}"),
            Self::Document(digest) => write!(f, "document {digest}"),
        }
    }
}

/// A blob file found during inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRecord {
    pub digest: Digest,
    /// Path handed to the deletion executor.
    pub filename: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub referrers: BTreeSet<Referrer>,
}

impl BlobRecord {
    pub fn new(
        digest: Digest,
        filename: impl Into<String>,
        size: u64,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            digest,
            filename: filename.into(),
            size,
            modified_at,
            referrers: BTreeSet::new(),
        }
    }

    pub fn is_referenced(&self) -> bool {
        !self.referrers.is_empty()
    }

    /// Age of the blob at `now`. A modification time in the future counts
    /// as zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.modified_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Unreferenced and at least `min_age` old.
    pub fn is_orphan(&self, min_age: Duration, now: DateTime<Utc>) -> bool {
        !self.is_referenced() && self.age_at(now) >= min_age
    }
}

/// A manifest file found during inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestRecord {
    pub name: String,
    /// Digest of the document this manifest points at, once scanned.
    pub target: Option<Digest>,
}

impl ManifestRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(mtime: i64) -> BlobRecord {
        BlobRecord::new(Digest::from_hash([7; 32]), "/data/blobs/sha256/x", 10, at(mtime))
    }

    #[test]
    fn age_is_distance_from_mtime() {
        assert_eq!(record(1_000).age_at(at(1_060)), Duration::from_secs(60));
    }

    #[test]
    fn future_mtime_has_zero_age() {
        assert_eq!(record(2_000).age_at(at(1_000)), Duration::ZERO);
    }

    #[test]
    fn orphan_boundary_is_inclusive() {
        let rec = record(0);
        assert!(rec.is_orphan(Duration::from_secs(100), at(100)));
        assert!(!rec.is_orphan(Duration::from_secs(101), at(100)));
    }

    #[test]
    fn referenced_record_is_never_orphan() {
        let mut rec = record(0);
        rec.referrers.insert(Referrer::Manifest("/data/manifests/m".into()));
        assert!(!rec.is_orphan(Duration::ZERO, at(1_000_000)));
    }

    #[test]
    fn referrer_display() {
        let d = Digest::from_hash([0xab; 32]);
        assert_eq!(Referrer::Manifest("m".into()).to_string(), "manifest m");
        assert_eq!(Referrer::Document(d).to_string(), format!("document {d}"));
    }
}
