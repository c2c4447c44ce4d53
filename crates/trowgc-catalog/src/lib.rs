//! Blob catalog and manifest index for one garbage-collection cycle.
//!
//! The catalog is the in-memory model the mark phase writes into and the
//! reap phase deletes from. It performs no I/O of its own: the only outward
//! call is the [`BlobDeleter`] handed to [`BlobCatalog::reap`].
//!
//! # Types
//!
//! - [`BlobCatalog`] -- blob records keyed by [`Digest`], with referrer sets
//! - [`ManifestIndex`] -- manifest records and their resolved targets
//! - [`OrphanSet`] -- unreferenced blobs old enough to reclaim
//! - [`CatalogSummary`] -- read-only aggregate printed after each cycle
//!
//! # Rules
//!
//! 1. A digest is normalized before it is stored or compared.
//! 2. A mention of an unknown digest is a warning, never an error.
//! 3. Records leave the catalog only through a successful, non-simulated reap.
//! 4. Catalogs are never shared between cycles.
//!
//! [`Digest`]: trowgc_types::Digest

pub mod blobs;
pub mod deleter;
pub mod error;
pub mod manifests;
pub mod record;
pub mod summary;

pub use blobs::{BlobCatalog, MentionOutcome, OrphanEntry, OrphanSet, ReapOutcome};
pub use deleter::{BlobDeleter, DeletionMode};
pub use error::{CatalogError, CatalogResult};
pub use manifests::ManifestIndex;
pub use record::{BlobRecord, ManifestRecord, Referrer};
pub use summary::CatalogSummary;
