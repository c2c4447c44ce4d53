//! Local filesystem transport.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use trowgc_catalog::{BlobDeleter, DeletionMode};
use trowgc_cycle::{DocumentFeed, InventoryFeed, ManifestFeed, StoreLayout};
use trowgc_types::{Digest, InventoryEntry, TransportError, TransportResult};
use walkdir::WalkDir;

use crate::disk::{local_df, DiskUsage};

/// Registry volume mounted on the local machine.
///
/// Paths in the inventory are reported as found under `root`, so the
/// layout prefixes must be rooted at the same place.
#[derive(Clone, Debug)]
pub struct LocalRegistry {
    root: PathBuf,
    layout: StoreLayout,
}

impl LocalRegistry {
    pub fn new(root: impl Into<PathBuf>, layout: StoreLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }
}

fn read_error(path: &str, err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::NotFound {
        TransportError::NotFound(path.to_string())
    } else {
        TransportError::Io(err)
    }
}

impl InventoryFeed for LocalRegistry {
    fn inventory(&mut self) -> TransportResult<Vec<InventoryEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| TransportError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = entry.path().to_str() else {
                warn!(path = %entry.path().display(), "skipping file with non UTF-8 path");
                continue;
            };
            let meta = entry.metadata().map_err(|e| TransportError::Io(e.into()))?;
            let modified_at: DateTime<Utc> = meta.modified()?.into();
            entries.push(InventoryEntry::new(path, meta.len(), modified_at));
        }
        debug!(root = %self.root.display(), files = entries.len(), "walked registry volume");
        Ok(entries)
    }
}

impl ManifestFeed for LocalRegistry {
    fn manifest_text(&mut self, name: &str) -> TransportResult<String> {
        match fs::read_to_string(name) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(TransportError::Malformed(format!("manifest {name} is not UTF-8")))
            }
            Err(e) => Err(read_error(name, e)),
        }
    }
}

impl DocumentFeed for LocalRegistry {
    fn document_bytes(&mut self, digest: &Digest) -> TransportResult<Vec<u8>> {
        let path = self.layout.blob_path(digest);
        fs::read(&path).map_err(|e| read_error(&path, e))
    }
}

impl BlobDeleter for LocalRegistry {
    fn delete(&mut self, paths: &[String], mode: DeletionMode) -> TransportResult<()> {
        // Every path must still be a regular file before anything is removed.
        for path in paths {
            let meta = fs::symlink_metadata(path).map_err(|e| {
                TransportError::Rejected(format!("pre-deletion check failed for {path}: {e}"))
            })?;
            if !meta.file_type().is_file() {
                return Err(TransportError::Rejected(format!("{path} is not a regular file")));
            }
        }

        if mode.is_simulated() {
            info!("dry run, files that would be deleted:");
            for path in paths {
                info!("{path}");
            }
            return Ok(());
        }

        for path in paths {
            fs::remove_file(path)?;
            debug!(%path, "removed");
        }
        info!(files = paths.len(), "orphaned blobs deleted");
        Ok(())
    }
}

impl DiskUsage for LocalRegistry {
    fn disk_usage(&mut self) -> TransportResult<String> {
        local_df(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use trowgc_catalog::ReapOutcome;
    use trowgc_cycle::{run_cycle, GcConfig, GcSettings};
    use trowgc_mark::DOCKER_MANIFEST_V2;

    struct Volume {
        _dir: tempfile::TempDir,
        root: String,
        layout: StoreLayout,
    }

    impl Volume {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = format!("{}/", dir.path().to_str().unwrap());
            let layout =
                StoreLayout::new(format!("{root}blobs/sha256"), format!("{root}manifests"));
            fs::create_dir_all(&layout.blob_prefix).unwrap();
            fs::create_dir_all(&layout.manifest_prefix).unwrap();
            Self {
                _dir: dir,
                root,
                layout,
            }
        }

        fn registry(&self) -> LocalRegistry {
            LocalRegistry::new(&self.root, self.layout.clone())
        }

        fn write(&self, path: &str, content: &[u8], age: Duration) -> String {
            if let Some(parent) = Path::new(path).parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
            let file = File::options().write(true).open(path).unwrap();
            file.set_modified(SystemTime::now() - age).unwrap();
            path.to_string()
        }

        fn blob(&self, digest: &Digest, content: &[u8], age: Duration) -> String {
            self.write(&self.layout.blob_path(digest), content, age)
        }

        fn manifest(&self, name: &str, text: &str, age: Duration) -> String {
            self.write(&format!("{}{name}", self.layout.manifest_prefix), text.as_bytes(), age)
        }
    }

    const DAY: Duration = Duration::from_secs(86_400);

    fn digest(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    // -----------------------------------------------------------------------
    // Feeds
    // -----------------------------------------------------------------------

    #[test]
    fn inventory_lists_regular_files_with_size_and_mtime() {
        let vol = Volume::new();
        let blob = vol.blob(&digest(1), b"hello", 2 * DAY);
        vol.manifest("app/latest", "sha256:x", DAY);

        let inv = vol.registry().inventory().unwrap();
        assert_eq!(inv.len(), 2);
        let entry = inv.iter().find(|e| e.path == blob).unwrap();
        assert_eq!(entry.size, 5);
        let age = Utc::now() - entry.modified_at;
        assert!(age >= chrono::Duration::days(2) - chrono::Duration::minutes(1));
    }

    #[test]
    fn manifest_and_document_reads() {
        let vol = Volume::new();
        let path = vol.manifest("app/latest", "sha256:abc\n", DAY);
        vol.blob(&digest(2), b"{}", DAY);
        let mut reg = vol.registry();
        assert_eq!(reg.manifest_text(&path).unwrap(), "sha256:abc\n");
        assert_eq!(reg.document_bytes(&digest(2)).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn missing_document_is_not_found() {
        let vol = Volume::new();
        let err = vol.registry().document_bytes(&digest(3)).unwrap_err();
        assert!(matches!(err, TransportError::NotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    #[test]
    fn deletion_precheck_rejects_before_removing_anything() {
        let vol = Volume::new();
        let present = vol.blob(&digest(1), b"x", DAY);
        let missing = vol.layout.blob_path(&digest(2));
        let err = vol
            .registry()
            .delete(&[present.clone(), missing], DeletionMode::Delete)
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
        assert!(Path::new(&present).exists());
    }

    #[test]
    fn deletion_rejects_directories() {
        let vol = Volume::new();
        let err = vol
            .registry()
            .delete(&[vol.layout.manifest_prefix.clone()], DeletionMode::Delete)
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[test]
    fn simulated_deletion_keeps_files() {
        let vol = Volume::new();
        let path = vol.blob(&digest(1), b"x", DAY);
        vol.registry().delete(&[path.clone()], DeletionMode::Simulate).unwrap();
        assert!(Path::new(&path).exists());
    }

    // -----------------------------------------------------------------------
    // Full cycle
    // -----------------------------------------------------------------------

    #[test]
    fn full_cycle_on_disk() {
        let vol = Volume::new();
        let (doc, cfg_blob, layer) = (digest(0xd), digest(0xc), digest(0x1));
        let document = serde_json::json!({
            "schemaVersion": 2,
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": cfg_blob.to_prefixed() },
            "layers": [{ "digest": layer.to_prefixed() }],
        });
        vol.blob(&doc, &serde_json::to_vec(&document).unwrap(), 3 * DAY);
        vol.blob(&cfg_blob, b"{}", 3 * DAY);
        vol.blob(&layer, &[0u8; 64], 3 * DAY);
        let old = vol.blob(&digest(0xa), &[0u8; 10], 3 * DAY);
        let young = vol.blob(&digest(0xb), &[0u8; 10], Duration::from_secs(60));
        vol.manifest("app/latest", &format!("{}\n", doc.to_prefixed()), 3 * DAY);

        let config = GcConfig::from_settings(&GcSettings {
            blob_prefix: Some(vol.layout.blob_prefix.clone()),
            manifest_prefix: Some(vol.layout.manifest_prefix.clone()),
            ..Default::default()
        });
        let report = run_cycle(&config, &mut vol.registry()).unwrap();

        assert_eq!(report.reap, ReapOutcome::Deleted { files: 1, bytes: 10 });
        assert!(!Path::new(&old).exists());
        assert!(Path::new(&young).exists());
        assert!(Path::new(&vol.layout.blob_path(&layer)).exists());
        assert_eq!(report.summary.blob_count, 4);
    }
}
