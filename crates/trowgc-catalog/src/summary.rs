use std::fmt;

use serde::Serialize;

/// Read-only aggregate over one cycle's catalogs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub blob_count: usize,
    pub total_bytes: u64,
    pub manifest_count: usize,
    pub orphan_count: usize,
    pub orphan_bytes: u64,
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blobs: {}", self.blob_count)?;
        writeln!(f, "Total size: {} bytes", self.total_bytes)?;
        writeln!(f, "Manifests: {}", self.manifest_count)?;
        writeln!(f, "Orphaned blobs: {}", self.orphan_count)?;
        write!(f, "Orphaned blob total size: {} bytes", self.orphan_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_field() {
        let summary = CatalogSummary {
            blob_count: 3,
            total_bytes: 300,
            manifest_count: 1,
            orphan_count: 2,
            orphan_bytes: 200,
        };
        let text = summary.to_string();
        assert!(text.contains("Blobs: 3"));
        assert!(text.contains("Total size: 300 bytes"));
        assert!(text.contains("Manifests: 1"));
        assert!(text.contains("Orphaned blobs: 2"));
        assert!(text.ends_with("Orphaned blob total size: 200 bytes"));
    }
}
