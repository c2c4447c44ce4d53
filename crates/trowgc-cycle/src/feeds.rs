//! Interfaces to the collaborators a cycle consumes.
//!
//! The cycle never performs I/O itself. Every call below may block for as
//! long as the transport needs; timeouts and retries belong to the
//! implementation, and any error aborts the running cycle.

use trowgc_catalog::BlobDeleter;
use trowgc_types::{Digest, InventoryEntry, TransportResult};

/// Lists every regular file on the registry volume.
pub trait InventoryFeed {
    fn inventory(&mut self) -> TransportResult<Vec<InventoryEntry>>;
}

/// Returns the raw text of a manifest file.
pub trait ManifestFeed {
    /// `name` is the manifest path exactly as the inventory reported it.
    fn manifest_text(&mut self, name: &str) -> TransportResult<String>;
}

/// Returns the raw bytes of a document blob.
pub trait DocumentFeed {
    fn document_bytes(&mut self, digest: &Digest) -> TransportResult<Vec<u8>>;
}

/// Everything a cycle needs from the outside world.
pub trait RegistryBackend: InventoryFeed + ManifestFeed + DocumentFeed + BlobDeleter {}

impl<T> RegistryBackend for T where
    T: InventoryFeed + ManifestFeed + DocumentFeed + BlobDeleter + ?Sized
{
}
