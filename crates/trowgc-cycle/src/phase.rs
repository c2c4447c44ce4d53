use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// The phases of a cycle, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Inventory,
    ManifestScan,
    DocumentFetchPlan,
    DocumentScan,
    OrphanCompute,
    Reap,
    Summary,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Inventory,
        Phase::ManifestScan,
        Phase::DocumentFetchPlan,
        Phase::DocumentScan,
        Phase::OrphanCompute,
        Phase::Reap,
        Phase::Summary,
    ];

    /// The phase that follows this one, or `None` after [`Phase::Summary`].
    pub fn next(self) -> Option<Phase> {
        match self {
            Self::Inventory => Some(Self::ManifestScan),
            Self::ManifestScan => Some(Self::DocumentFetchPlan),
            Self::DocumentFetchPlan => Some(Self::DocumentScan),
            Self::DocumentScan => Some(Self::OrphanCompute),
            Self::OrphanCompute => Some(Self::Reap),
            Self::Reap => Some(Self::Summary),
            Self::Summary => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Inventory => "INVENTORY",
            Self::ManifestScan => "MANIFEST_SCAN",
            Self::DocumentFetchPlan => "DOCUMENT_FETCH_PLAN",
            Self::DocumentScan => "DOCUMENT_SCAN",
            Self::OrphanCompute => "ORPHAN_COMPUTE",
            Self::Reap => "REAP",
            Self::Summary => "SUMMARY",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time spent in one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_phases_in_order() {
        let mut walked = vec![Phase::Inventory];
        while let Some(next) = walked.last().and_then(|p| p.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Phase::ALL.to_vec());
    }

    #[test]
    fn ordering_matches_execution_order() {
        assert!(Phase::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn serializes_as_display_name() {
        for phase in Phase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{phase}\""));
        }
    }
}
