use std::collections::{BTreeMap, BTreeSet};

use trowgc_types::Digest;

use crate::blobs::{BlobCatalog, MentionOutcome};
use crate::error::{CatalogError, CatalogResult};
use crate::record::{ManifestRecord, Referrer};

/// Manifest records for one cycle, keyed by manifest path.
#[derive(Clone, Debug, Default)]
pub struct ManifestIndex {
    manifests: BTreeMap<String, ManifestRecord>,
}

impl ManifestIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ManifestRecord> {
        self.manifests.get(name)
    }

    /// Manifest names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.manifests.keys().cloned().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.manifests.values()
    }

    /// Register a manifest with no target. Registering twice is a no-op.
    pub fn register_manifest(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.manifests
            .entry(name.clone())
            .or_insert_with(|| ManifestRecord::new(name));
    }

    /// Point manifest `name` at `raw_digest` and mark the target blob as
    /// referenced by the manifest.
    ///
    /// The target is set at most once per cycle. A dangling target is still
    /// recorded on the manifest; the catalog reports it as a warning.
    pub fn set_manifest_blob(
        &mut self,
        name: &str,
        raw_digest: &str,
        blobs: &mut BlobCatalog,
    ) -> CatalogResult<MentionOutcome> {
        let digest = Digest::parse(raw_digest)?;
        let record = self
            .manifests
            .get_mut(name)
            .ok_or_else(|| CatalogError::UnknownManifest(name.to_string()))?;
        if let Some(existing) = record.target {
            return Err(CatalogError::AlreadyResolved {
                name: name.to_string(),
                existing,
            });
        }
        record.target = Some(digest);
        Ok(blobs.record_digest_mention(digest, Referrer::Manifest(name.to_string())))
    }

    /// Names of manifests that have no target.
    pub fn unresolved(&self) -> Vec<&str> {
        self.manifests
            .values()
            .filter(|m| !m.is_resolved())
            .map(|m| m.name.as_str())
            .collect()
    }

    /// The deduplicated set of resolved targets.
    pub fn targets(&self) -> BTreeSet<Digest> {
        self.manifests.values().filter_map(|m| m.target).collect()
    }
}
