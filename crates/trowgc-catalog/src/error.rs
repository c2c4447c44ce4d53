use trowgc_types::{Digest, TransportError, TypeError};

/// Errors from catalog operations.
///
/// Every variant is fatal for the running cycle. Recoverable conditions
/// (dangling references) are reported through
/// [`MentionOutcome`](crate::MentionOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A mention carried a digest that is not 64 lowercase hex characters.
    #[error(transparent)]
    MalformedDigest(#[from] TypeError),

    /// A target was set on a manifest that was never registered.
    #[error("unknown manifest: {0}")]
    UnknownManifest(String),

    /// A manifest's target was set a second time.
    #[error("manifest {name} already resolved to {existing}")]
    AlreadyResolved { name: String, existing: Digest },

    /// The deletion executor failed; the catalog was left unchanged.
    #[error("deletion failed: {0}")]
    Deletion(#[source] TransportError),
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
