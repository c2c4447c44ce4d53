use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One regular file reported by the inventory feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Absolute path of the file on the registry's storage.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

impl InventoryEntry {
    pub fn new(path: impl Into<String>, size: u64, modified_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            size,
            modified_at,
        }
    }

    /// The path relative to `prefix`, if the entry lives under it.
    ///
    /// Returns `None` for entries outside the prefix and for the prefix
    /// itself.
    pub fn relative_to(&self, prefix: &str) -> Option<&str> {
        self.path
            .strip_prefix(prefix)
            .filter(|rest| !rest.is_empty())
    }
}
