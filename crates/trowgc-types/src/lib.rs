//! Foundation types for trowgc, the registry blob garbage collector.
//!
//! Every other trowgc crate depends on `trowgc-types`. The digest is the only
//! wire format the collector owns; everything else it receives from a
//! transport is treated as opaque.
//!
//! # Key Types
//!
//! - [`Digest`] -- normalized SHA-256 content digest of a blob
//! - [`InventoryEntry`] -- one file reported by the inventory feed
//! - [`TypeError`] -- digest parsing failures
//! - [`TransportError`] -- failures reported by external collaborators

pub mod digest;
pub mod error;
pub mod inventory;

pub use digest::{Digest, SHA256_PREFIX};
pub use error::{TransportError, TransportResult, TypeError};
pub use inventory::InventoryEntry;
