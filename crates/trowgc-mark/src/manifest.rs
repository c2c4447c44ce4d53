use tracing::{debug, info};
use trowgc_catalog::{BlobCatalog, ManifestIndex, MentionOutcome};
use trowgc_types::SHA256_PREFIX;

use crate::error::MarkResult;

/// Find the target token in a manifest file.
///
/// Returns the first whitespace-delimited field after `sha256:` on the first
/// line that starts with `sha256:`. Later lines are not inspected. The token
/// is not validated here; an empty token comes back as `Some("")`.
pub fn scan_manifest_text(text: &str) -> Option<&str> {
    text.trim()
        .lines()
        .find_map(|line| line.strip_prefix(SHA256_PREFIX))
        .map(|rest| rest.split_whitespace().next().unwrap_or(""))
}

/// Scan manifest `name` and, if it names a target, resolve it in `index`.
///
/// Returns `None` when the text has no `sha256:` line; the manifest stays
/// unresolved.
pub fn mark_manifest(
    index: &mut ManifestIndex,
    blobs: &mut BlobCatalog,
    name: &str,
    text: &str,
) -> MarkResult<Option<MentionOutcome>> {
    info!(manifest = name, "parsing manifest");
    let Some(token) = scan_manifest_text(text) else {
        debug!(manifest = name, "no sha256 line, leaving unresolved");
        return Ok(None);
    };
    let outcome = index.set_manifest_blob(name, token, blobs)?;
    Ok(Some(outcome))
}
