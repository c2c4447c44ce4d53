//! Mark phase of the collector.
//!
//! Two reference mechanisms feed the [`BlobCatalog`]:
//!
//! - **Manifest → document.** A manifest file names its document on the
//!   first line starting with `sha256:` ([`scan_manifest_text`]).
//! - **Document → config + layers.** A Docker distribution manifest (schema
//!   2) names one config blob and a list of layer blobs
//!   ([`ImageDocument::parse`]).
//!
//! Parsing is pure. The `mark_*` functions apply the extracted edges to the
//! catalogs and return the mention outcomes so callers can collect dangling
//! references.
//!
//! [`BlobCatalog`]: trowgc_catalog::BlobCatalog

pub mod document;
pub mod error;
pub mod manifest;

pub use document::{mark_document, ImageDocument, DOCKER_MANIFEST_V2};
pub use error::{MarkError, MarkResult, StructuralError};
pub use manifest::{mark_manifest, scan_manifest_text};
