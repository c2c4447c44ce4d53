use trowgc_types::TransportResult;

/// How a [`BlobDeleter`] should treat the paths it is handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeletionMode {
    /// Remove the files.
    Delete,
    /// Go through the same motions without removing anything.
    Simulate,
}

impl DeletionMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            Self::Simulate
        } else {
            Self::Delete
        }
    }

    pub fn is_simulated(self) -> bool {
        matches!(self, Self::Simulate)
    }
}

/// The deletion boundary of the collector.
///
/// Implementations must satisfy:
/// - `paths` is never empty; the catalog skips the call instead.
/// - All-or-nothing: either every path is removed and `Ok(())` is returned,
///   or an error is returned and the catalog treats nothing as removed.
/// - [`DeletionMode::Simulate`] follows the same contract without removing.
pub trait BlobDeleter {
    /// Delete (or simulate deleting) every path in `paths`.
    fn delete(&mut self, paths: &[String], mode: DeletionMode) -> TransportResult<()>;
}

impl<T: BlobDeleter + ?Sized> BlobDeleter for &mut T {
    fn delete(&mut self, paths: &[String], mode: DeletionMode) -> TransportResult<()> {
        (**self).delete(paths, mode)
    }
}
