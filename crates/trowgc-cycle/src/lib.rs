//! The garbage-collection cycle for a registry blob store.
//!
//! A cycle runs seven phases in a fixed order, each reading only what the
//! phases before it produced:
//!
//! ```text
//! INVENTORY -> MANIFEST_SCAN -> DOCUMENT_FETCH_PLAN -> DOCUMENT_SCAN
//!           -> ORPHAN_COMPUTE -> REAP -> SUMMARY
//! ```
//!
//! [`GcCycle`] owns a fresh [`BlobCatalog`] and [`ManifestIndex`] for the
//! duration of one cycle and drops them when the cycle ends, whether it
//! finished or failed. It talks to the outside world only through the
//! collaborator traits in [`feeds`].
//!
//! Any doubt about reachability aborts the cycle: malformed digests,
//! structurally invalid documents, manifests without a target and transport
//! failures are all fatal. Dangling references are the only recoverable
//! condition and are collected as [`Warning`]s.
//!
//! [`BlobCatalog`]: trowgc_catalog::BlobCatalog
//! [`ManifestIndex`]: trowgc_catalog::ManifestIndex

pub mod config;
pub mod error;
pub mod executor;
pub mod feeds;
pub mod memory;
pub mod phase;
pub mod report;

pub use config::{GcConfig, GcSettings, StoreLayout};
pub use error::{CycleError, CycleResult};
pub use executor::{run_cycle, GcCycle};
pub use feeds::{DocumentFeed, InventoryFeed, ManifestFeed, RegistryBackend};
pub use memory::{DeletionCall, InMemoryRegistry};
pub use phase::{Phase, PhaseTiming};
pub use report::{CycleId, CycleReport, Warning};
