use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The input is not 64 lowercase hex characters once any `sha256:`
    /// prefix has been stripped.
    #[error("malformed digest: {0:?}")]
    MalformedDigest(String),
}

/// Errors reported by an external collaborator (inventory, content feeds,
/// deletion executor).
///
/// The collector never retries these; any transport failure aborts the
/// running cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A spawned command exited unsuccessfully.
    #[error("command `{command}` failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The collaborator returned data the collector cannot interpret.
    #[error("malformed transport output: {0}")]
    Malformed(String),

    /// The requested object does not exist on the other side.
    #[error("not found: {0}")]
    NotFound(String),

    /// The collaborator refused the request before touching anything.
    #[error("rejected: {0}")]
    Rejected(String),

    /// I/O error while talking to the collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
