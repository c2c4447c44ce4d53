use thiserror::Error;
use trowgc_catalog::CatalogError;
use trowgc_types::TypeError;

/// Ways an image document can fail shape validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("document is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("unexpected mediaType {found:?}")]
    MediaType { found: Option<String> },

    #[error("config is missing or not an object")]
    MissingConfig,

    #[error("config has no string digest")]
    MissingConfigDigest,

    #[error("layers is missing or not an array")]
    MissingLayers,

    #[error("layer {index} is not an object")]
    LayerNotAnObject { index: usize },

    #[error("layer {index} has no string digest")]
    MissingLayerDigest { index: usize },
}

/// Errors from the mark phase. All are fatal for the cycle.
#[derive(Debug, Error)]
pub enum MarkError {
    #[error("structural error in document {document}: {source}")]
    Structural {
        document: String,
        #[source]
        source: StructuralError,
    },

    #[error(transparent)]
    MalformedDigest(#[from] TypeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result alias for mark operations.
pub type MarkResult<T> = Result<T, MarkError>;
