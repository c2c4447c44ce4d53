use trowgc_catalog::CatalogError;
use trowgc_mark::MarkError;
use trowgc_types::TransportError;

use crate::phase::Phase;

/// Fatal errors that abort a cycle.
///
/// Each variant records the phase it was raised in. Nothing from an aborted
/// cycle is carried into the next one.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// An external collaborator failed.
    #[error("{phase}: transport failure: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },

    /// A manifest or document could not be marked.
    #[error("{phase}: {source}")]
    Mark {
        phase: Phase,
        #[source]
        source: MarkError,
    },

    /// The catalog rejected an operation (including a failed deletion).
    #[error("{phase}: {source}")]
    Catalog {
        phase: Phase,
        #[source]
        source: CatalogError,
    },

    /// Manifests without a target were left after the manifest scan.
    #[error(
        "no blob found for {} manifest(s), first: {}",
        .manifests.len(),
        .manifests.first().map(String::as_str).unwrap_or("?")
    )]
    FatalMissingReference { manifests: Vec<String> },

    /// A phase was requested before its predecessors ran.
    #[error("phase {requested} requested while cycle is at {current}")]
    OutOfOrder { current: Phase, requested: Phase },
}

impl CycleError {
    /// The phase the cycle was in when it failed.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Transport { phase, .. }
            | Self::Mark { phase, .. }
            | Self::Catalog { phase, .. } => *phase,
            Self::FatalMissingReference { .. } => Phase::DocumentFetchPlan,
            Self::OutOfOrder { current, .. } => *current,
        }
    }

    pub(crate) fn transport(phase: Phase) -> impl FnOnce(TransportError) -> Self {
        move |source| Self::Transport { phase, source }
    }

    pub(crate) fn mark(phase: Phase) -> impl FnOnce(MarkError) -> Self {
        move |source| Self::Mark { phase, source }
    }

    pub(crate) fn catalog(phase: Phase) -> impl FnOnce(CatalogError) -> Self {
        move |source| Self::Catalog { phase, source }
    }
}

/// Result alias for cycle operations.
pub type CycleResult<T> = Result<T, CycleError>;
