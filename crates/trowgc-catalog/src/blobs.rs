//! The blob side of the catalog: registration, mentions, orphans and reap.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use trowgc_types::Digest;

use crate::deleter::{BlobDeleter, DeletionMode};
use crate::error::{CatalogError, CatalogResult};
use crate::manifests::ManifestIndex;
use crate::record::{BlobRecord, Referrer};
use crate::summary::CatalogSummary;

/// What [`BlobCatalog::record_mention`] did with a mention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MentionOutcome {
    /// The referrer was added to (or already present in) the blob's set.
    Recorded,
    /// The digest is not in the catalog. Nothing was mutated.
    Dangling(Digest),
}

impl MentionOutcome {
    pub fn is_dangling(&self) -> bool {
        matches!(self, Self::Dangling(_))
    }
}

/// A blob selected for reclamation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanEntry {
    pub digest: Digest,
    pub filename: String,
    pub size: u64,
}

/// Unreferenced blobs at least the minimum age old, ordered by digest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrphanSet {
    entries: Vec<OrphanEntry>,
}

impl OrphanSet {
    pub fn entries(&self) -> &[OrphanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Filenames in the order they are handed to the deletion executor.
    pub fn filenames(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.filename.clone()).collect()
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.entries.iter().any(|e| &e.digest == digest)
    }
}

/// Result of [`BlobCatalog::reap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReapOutcome {
    /// No orphans; the deletion executor was not called.
    Skipped,
    /// The executor simulated the deletion; the catalog is unchanged.
    Simulated { files: usize, bytes: u64 },
    /// The executor removed the files and the records were dropped.
    Deleted { files: usize, bytes: u64 },
}

impl ReapOutcome {
    /// Number of files handed to the deletion executor.
    pub fn files(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Simulated { files, .. } | Self::Deleted { files, .. } => *files,
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            Self::Skipped => 0,
            Self::Simulated { bytes, .. } | Self::Deleted { bytes, .. } => *bytes,
        }
    }
}

/// Blob records for one cycle, keyed by normalized digest.
#[derive(Clone, Debug, Default)]
pub struct BlobCatalog {
    blobs: BTreeMap<Digest, BlobRecord>,
}

impl BlobCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn get(&self, digest: &Digest) -> Option<&BlobRecord> {
        self.blobs.get(digest)
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.blobs.contains_key(digest)
    }

    /// All records in digest order.
    pub fn records(&self) -> impl Iterator<Item = &BlobRecord> {
        self.blobs.values()
    }

    pub fn total_bytes(&self) -> u64 {
        self.blobs.values().map(|b| b.size).sum()
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    /// Register a blob found on disk.
    ///
    /// Registering the same digest twice replaces the earlier record.
    pub fn register_blob(
        &mut self,
        digest: Digest,
        filename: impl Into<String>,
        size: u64,
        modified_at: DateTime<Utc>,
    ) {
        let record = BlobRecord::new(digest, filename, size, modified_at);
        if let Some(previous) = self.blobs.insert(digest, record) {
            debug!(%digest, previous = %previous.filename, "blob registered twice, keeping latest");
        }
    }

    // -----------------------------------------------------------------------
    // Mark
    // -----------------------------------------------------------------------

    /// Record that `referrer` keeps the blob named by `raw_digest` alive.
    ///
    /// `raw_digest` may carry a `sha256:` prefix. A malformed digest is an
    /// error; an unknown digest is logged and reported as
    /// [`MentionOutcome::Dangling`] without touching the catalog.
    pub fn record_mention(
        &mut self,
        raw_digest: &str,
        referrer: Referrer,
    ) -> CatalogResult<MentionOutcome> {
        let digest = Digest::parse(raw_digest)?;
        Ok(self.record_digest_mention(digest, referrer))
    }

    /// [`record_mention`](Self::record_mention) for an already-normalized digest.
    pub fn record_digest_mention(&mut self, digest: Digest, referrer: Referrer) -> MentionOutcome {
        match self.blobs.get_mut(&digest) {
            Some(record) => {
                debug!(%digest, %referrer, "mention recorded");
                record.referrers.insert(referrer);
                MentionOutcome::Recorded
            }
            None => {
                warn!(%digest, %referrer, "referrer points to a blob that doesn't exist on disk");
                MentionOutcome::Dangling(digest)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------------

    /// Blobs with no referrers whose age at `now` is at least `min_age`.
    pub fn compute_orphans(&self, min_age: Duration, now: DateTime<Utc>) -> OrphanSet {
        let entries = self
            .blobs
            .values()
            .filter(|b| b.is_orphan(min_age, now))
            .map(|b| OrphanEntry {
                digest: b.digest,
                filename: b.filename.clone(),
                size: b.size,
            })
            .collect();
        OrphanSet { entries }
    }

    /// Hand the orphans to `deleter`, then drop their records.
    ///
    /// An empty set skips the deleter entirely. Otherwise the deleter is
    /// called exactly once, in simulate mode when `dry_run` is set. Records
    /// are removed only after a successful, non-simulated call.
    pub fn reap<D>(
        &mut self,
        orphans: &OrphanSet,
        dry_run: bool,
        deleter: &mut D,
    ) -> CatalogResult<ReapOutcome>
    where
        D: BlobDeleter + ?Sized,
    {
        if orphans.is_empty() {
            info!("no files to delete, skipping");
            return Ok(ReapOutcome::Skipped);
        }

        let mode = DeletionMode::from_dry_run(dry_run);
        let filenames = orphans.filenames();
        let files = filenames.len();
        let bytes = orphans.total_bytes();
        info!(files, bytes, dry_run, "deleting orphaned blobs");

        deleter.delete(&filenames, mode).map_err(CatalogError::Deletion)?;

        if mode.is_simulated() {
            return Ok(ReapOutcome::Simulated { files, bytes });
        }
        for entry in orphans.entries() {
            self.blobs.remove(&entry.digest);
        }
        Ok(ReapOutcome::Deleted { files, bytes })
    }

    /// Aggregate counts for reporting. Orphans are evaluated with the same
    /// `min_age` and `now` the sweep uses.
    pub fn summary(
        &self,
        manifests: &ManifestIndex,
        min_age: Duration,
        now: DateTime<Utc>,
    ) -> CatalogSummary {
        let orphans = self.compute_orphans(min_age, now);
        CatalogSummary {
            blob_count: self.len(),
            total_bytes: self.total_bytes(),
            manifest_count: manifests.len(),
            orphan_count: orphans.len(),
            orphan_bytes: orphans.total_bytes(),
        }
    }
}
