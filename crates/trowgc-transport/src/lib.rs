//! Transports that connect the collector to a real registry volume.
//!
//! Both backends implement every collaborator trait from `trowgc-cycle`
//! plus [`DiskUsage`]:
//!
//! - [`KubectlRegistry`] -- runs commands inside the registry pod through
//!   `kubectl exec`
//! - [`LocalRegistry`] -- reads and deletes files on a locally mounted volume
//!
//! The cycle itself never sees these types; it only sees the traits.

pub mod disk;
pub mod kubectl;
pub mod local;
pub mod stat;

pub use disk::DiskUsage;
pub use kubectl::{KubectlConfig, KubectlRegistry};
pub use local::LocalRegistry;
pub use stat::{parse_stat_line, parse_stat_output};
