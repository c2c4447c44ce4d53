use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use trowgc_catalog::{BlobDeleter, DeletionMode};
use trowgc_types::{Digest, InventoryEntry, TransportError, TransportResult};

use crate::config::StoreLayout;
use crate::feeds::{DocumentFeed, InventoryFeed, ManifestFeed};

#[derive(Clone, Debug)]
struct MemFile {
    content: Vec<u8>,
    modified_at: DateTime<Utc>,
}

/// One call made to [`InMemoryRegistry`]'s deletion boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionCall {
    pub paths: Vec<String>,
    pub mode: DeletionMode,
}

/// `BTreeMap`-backed registry volume.
///
/// Intended for tests and embedding. Implements every collaborator trait and
/// records each deletion call so callers can assert on the boundary.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    layout: StoreLayout,
    files: BTreeMap<String, MemFile>,
    deletions: Vec<DeletionCall>,
    document_fetches: Vec<Digest>,
    fail_deletions: bool,
}

impl InMemoryRegistry {
    /// Create an empty registry using `layout`.
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    /// Store an arbitrary file.
    pub fn put_file(
        &mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        modified_at: DateTime<Utc>,
    ) {
        self.files.insert(
            path.into(),
            MemFile {
                content: content.into(),
                modified_at,
            },
        );
    }

    /// Store a blob under its digest and return its path.
    pub fn put_blob(
        &mut self,
        digest: &Digest,
        content: impl Into<Vec<u8>>,
        modified_at: DateTime<Utc>,
    ) -> String {
        let path = self.layout.blob_path(digest);
        self.put_file(path.clone(), content, modified_at);
        path
    }

    /// Store a manifest file at `<manifest_prefix><name>` and return its path.
    pub fn put_manifest(&mut self, name: &str, text: &str, modified_at: DateTime<Utc>) -> String {
        let path = format!("{}{}", self.layout.manifest_prefix, name);
        self.put_file(path.clone(), text, modified_at);
        path
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Every deletion call made so far, in order.
    pub fn deletions(&self) -> &[DeletionCall] {
        &self.deletions
    }

    /// Every document digest fetched so far, in order.
    pub fn document_fetches(&self) -> &[Digest] {
        &self.document_fetches
    }

    /// Make every subsequent deletion call fail before touching any file.
    pub fn fail_deletions(&mut self, fail: bool) {
        self.fail_deletions = fail;
    }
}

impl InventoryFeed for InMemoryRegistry {
    fn inventory(&mut self) -> TransportResult<Vec<InventoryEntry>> {
        Ok(self
            .files
            .iter()
            .map(|(path, f)| {
                InventoryEntry::new(path.clone(), f.content.len() as u64, f.modified_at)
            })
            .collect())
    }
}

impl ManifestFeed for InMemoryRegistry {
    fn manifest_text(&mut self, name: &str) -> TransportResult<String> {
        let file = self
            .files
            .get(name)
            .ok_or_else(|| TransportError::NotFound(name.to_string()))?;
        String::from_utf8(file.content.clone())
            .map_err(|e| TransportError::Malformed(format!("manifest {name} is not UTF-8: {e}")))
    }
}

impl DocumentFeed for InMemoryRegistry {
    fn document_bytes(&mut self, digest: &Digest) -> TransportResult<Vec<u8>> {
        self.document_fetches.push(*digest);
        let path = self.layout.blob_path(digest);
        self.files
            .get(&path)
            .map(|f| f.content.clone())
            .ok_or(TransportError::NotFound(path))
    }
}

impl BlobDeleter for InMemoryRegistry {
    fn delete(&mut self, paths: &[String], mode: DeletionMode) -> TransportResult<()> {
        self.deletions.push(DeletionCall {
            paths: paths.to_vec(),
            mode,
        });
        if self.fail_deletions {
            return Err(TransportError::Rejected("deletion disabled".into()));
        }
        if let Some(missing) = paths.iter().find(|p| !self.files.contains_key(*p)) {
            return Err(TransportError::NotFound(missing.clone()));
        }
        if mode == DeletionMode::Delete {
            for path in paths {
                self.files.remove(path);
            }
        }
        Ok(())
    }
}
