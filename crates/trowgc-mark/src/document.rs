//! Image documents (Docker distribution manifests, schema 2).

use serde_json::{Map, Value};
use tracing::debug;
use trowgc_catalog::{BlobCatalog, MentionOutcome, Referrer};
use trowgc_types::Digest;

use crate::error::{MarkError, MarkResult, StructuralError};

/// The only document media type the collector understands.
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// The references carried by one image document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDocument {
    pub config: Digest,
    pub layers: Vec<Digest>,
}

impl ImageDocument {
    /// Validate `bytes` and extract its config and layer digests.
    ///
    /// Validation is all-or-nothing and runs in a fixed order: JSON object,
    /// `mediaType`, `config.digest`, then every `layers[i].digest`. Digests
    /// are normalized only once the shape has been accepted.
    pub fn parse(document: &Digest, bytes: &[u8]) -> MarkResult<Self> {
        let (config, layers) = extract_digests(bytes).map_err(|source| MarkError::Structural {
            document: document.to_hex(),
            source,
        })?;
        let config = Digest::parse(&config)?;
        let layers = layers
            .iter()
            .map(|raw| Digest::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, layers })
    }

    /// Config first, then layers in document order.
    pub fn references(&self) -> impl Iterator<Item = &Digest> {
        std::iter::once(&self.config).chain(self.layers.iter())
    }
}

fn extract_digests(bytes: &[u8]) -> Result<(String, Vec<String>), StructuralError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StructuralError::InvalidJson(e.to_string()))?;
    let Value::Object(mut root) = value else {
        return Err(StructuralError::NotAnObject);
    };

    match root.get("mediaType").and_then(Value::as_str) {
        Some(DOCKER_MANIFEST_V2) => {}
        other => {
            return Err(StructuralError::MediaType {
                found: other.map(str::to_string),
            })
        }
    }

    let Some(Value::Object(config)) = root.remove("config") else {
        return Err(StructuralError::MissingConfig);
    };
    let config = digest_field(&config).ok_or(StructuralError::MissingConfigDigest)?;

    let Some(Value::Array(layers)) = root.remove("layers") else {
        return Err(StructuralError::MissingLayers);
    };
    let layers = layers
        .iter()
        .enumerate()
        .map(|(index, layer)| {
            let layer = layer
                .as_object()
                .ok_or(StructuralError::LayerNotAnObject { index })?;
            digest_field(layer).ok_or(StructuralError::MissingLayerDigest { index })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((config, layers))
}

fn digest_field(object: &Map<String, Value>) -> Option<String> {
    object.get("digest").and_then(Value::as_str).map(str::to_string)
}

/// Parse document `digest` and mark its config and layers as referenced by
/// it.
///
/// Nothing is recorded unless the whole document validates.
pub fn mark_document(
    blobs: &mut BlobCatalog,
    digest: &Digest,
    bytes: &[u8],
) -> MarkResult<Vec<MentionOutcome>> {
    let document = ImageDocument::parse(digest, bytes)?;
    debug!(document = %digest, layers = document.layers.len(), "document parsed");
    let outcomes = document
        .references()
        .map(|target| blobs.record_digest_mention(*target, Referrer::Document(*digest)))
        .collect();
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn digest(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    fn doc(config: &Digest, layers: &[Digest]) -> Vec<u8> {
        let layers: Vec<Value> = layers
            .iter()
            .map(|l| {
                json!({
                    "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                    "size": 1,
                    "digest": l.to_prefixed(),
                })
            })
            .collect();
        serde_json::to_vec(&json!({
            "schemaVersion": 2,
            "mediaType": DOCKER_MANIFEST_V2,
            "config": {
                "mediaType": "application/vnd.docker.container.image.v1+json",
                "digest": config.to_prefixed(),
            },
            "layers": layers,
        }))
        .unwrap()
    }

    fn structural(bytes: &[u8]) -> StructuralError {
        match ImageDocument::parse(&digest(0xd), bytes).unwrap_err() {
            MarkError::Structural { source, .. } => source,
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    fn catalog_with(bytes: &[u8]) -> BlobCatalog {
        let mut blobs = BlobCatalog::new();
        for &b in bytes {
            let d = digest(b);
            blobs.register_blob(d, format!("/data/blobs/sha256/{d}"), 1, Utc::now());
        }
        blobs
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parses_config_and_layers() {
        let bytes = doc(&digest(0xc), &[digest(1), digest(2)]);
        let parsed = ImageDocument::parse(&digest(0xd), &bytes).unwrap();
        assert_eq!(parsed.config, digest(0xc));
        assert_eq!(parsed.layers, vec![digest(1), digest(2)]);
        assert_eq!(parsed.references().count(), 3);
    }

    #[test]
    fn empty_layer_list_is_valid() {
        let parsed = ImageDocument::parse(&digest(0xd), &doc(&digest(0xc), &[])).unwrap();
        assert!(parsed.layers.is_empty());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(structural(b"{not json"), StructuralError::InvalidJson(_)));
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(structural(b"[1, 2, 3]"), StructuralError::NotAnObject);
    }

    #[test]
    fn rejects_wrong_media_type() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "config": { "digest": digest(1).to_prefixed() },
            "layers": [],
        }))
        .unwrap();
        assert_eq!(
            structural(&bytes),
            StructuralError::MediaType {
                found: Some("application/vnd.oci.image.index.v1+json".into())
            }
        );
    }

    #[test]
    fn rejects_missing_media_type() {
        let bytes = br#"{"config": {"digest": "x"}, "layers": []}"#;
        assert_eq!(structural(bytes), StructuralError::MediaType { found: None });
    }

    #[test]
    fn rejects_missing_config_digest() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "size": 3 },
            "layers": [],
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::MissingConfigDigest);
    }

    #[test]
    fn rejects_non_object_config() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": digest(1).to_prefixed(),
            "layers": [],
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::MissingConfig);
    }

    #[test]
    fn rejects_missing_layers() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": digest(1).to_prefixed() },
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::MissingLayers);
    }

    #[test]
    fn rejects_layer_without_digest() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": digest(1).to_prefixed() },
            "layers": [ { "digest": digest(2).to_prefixed() }, { "size": 5 } ],
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::MissingLayerDigest { index: 1 });
    }

    #[test]
    fn rejects_non_object_layer() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": digest(1).to_prefixed() },
            "layers": [ digest(2).to_prefixed() ],
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::LayerNotAnObject { index: 0 });
    }

    #[test]
    fn rejects_numeric_digest() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": 42 },
            "layers": [],
        }))
        .unwrap();
        assert_eq!(structural(&bytes), StructuralError::MissingConfigDigest);
    }

    #[test]
    fn malformed_layer_digest_is_not_structural() {
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": digest(1).to_prefixed() },
            "layers": [ { "digest": "sha256:deadbeef" } ],
        }))
        .unwrap();
        let err = ImageDocument::parse(&digest(0xd), &bytes).unwrap_err();
        assert!(matches!(err, MarkError::MalformedDigest(_)));
    }

    // -----------------------------------------------------------------------
    // Marking
    // -----------------------------------------------------------------------

    #[test]
    fn mark_records_document_as_referrer() {
        let mut blobs = catalog_with(&[0xc, 1, 2]);
        let bytes = doc(&digest(0xc), &[digest(1), digest(2)]);
        let outcomes = mark_document(&mut blobs, &digest(0xd), &bytes).unwrap();
        assert_eq!(outcomes, vec![MentionOutcome::Recorded; 3]);
        for b in [0xc, 1, 2] {
            let referrers = &blobs.get(&digest(b)).unwrap().referrers;
            assert_eq!(referrers.len(), 1);
            assert!(referrers.contains(&Referrer::Document(digest(0xd))));
        }
    }

    #[test]
    fn mark_reports_dangling_layers() {
        let mut blobs = catalog_with(&[0xc]);
        let bytes = doc(&digest(0xc), &[digest(7)]);
        let outcomes = mark_document(&mut blobs, &digest(0xd), &bytes).unwrap();
        assert_eq!(outcomes[0], MentionOutcome::Recorded);
        assert_eq!(outcomes[1], MentionOutcome::Dangling(digest(7)));
    }

    #[test]
    fn failed_validation_records_nothing() {
        let mut blobs = catalog_with(&[1, 2]);
        let bytes = serde_json::to_vec(&json!({
            "mediaType": DOCKER_MANIFEST_V2,
            "config": { "digest": digest(1).to_prefixed() },
            "layers": [ { "digest": digest(2).to_prefixed() }, { "digest": "deadbeef" } ],
        }))
        .unwrap();
        assert!(mark_document(&mut blobs, &digest(0xd), &bytes).is_err());
        assert!(blobs.records().all(|r| !r.is_referenced()));
    }
}
