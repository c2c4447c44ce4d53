//! The cycle state machine.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};
use trowgc_catalog::{BlobCatalog, ManifestIndex, MentionOutcome, OrphanSet, ReapOutcome, Referrer};
use trowgc_mark::{mark_document, mark_manifest};
use trowgc_types::Digest;

use crate::config::GcConfig;
use crate::error::{CycleError, CycleResult};
use crate::feeds::RegistryBackend;
use crate::phase::{Phase, PhaseTiming};
use crate::report::{CycleId, CycleReport, Warning};

/// One garbage-collection cycle.
///
/// The cycle owns its catalogs and walks the phases in [`Phase::ALL`] order.
/// Each step method checks that it is being called at the right point and
/// fails with [`CycleError::OutOfOrder`] otherwise. [`GcCycle::run`] drives
/// every step; the individual steps are public so callers can inspect the
/// catalogs between phases.
pub struct GcCycle<'a, B: RegistryBackend + ?Sized> {
    id: CycleId,
    config: &'a GcConfig,
    backend: &'a mut B,
    now: DateTime<Utc>,
    phase: Phase,
    blobs: BlobCatalog,
    manifests: ManifestIndex,
    plan: Vec<Digest>,
    orphans: OrphanSet,
    reap: ReapOutcome,
    warnings: Vec<Warning>,
    timings: Vec<PhaseTiming>,
}

impl<'a, B: RegistryBackend + ?Sized> GcCycle<'a, B> {
    /// Start a cycle with empty catalogs. `now` is the reference time for
    /// every age computation in this cycle.
    pub fn new(config: &'a GcConfig, backend: &'a mut B, now: DateTime<Utc>) -> Self {
        Self {
            id: CycleId::new(),
            config,
            backend,
            now,
            phase: Phase::Inventory,
            blobs: BlobCatalog::new(),
            manifests: ManifestIndex::new(),
            plan: Vec::new(),
            orphans: OrphanSet::default(),
            reap: ReapOutcome::Skipped,
            warnings: Vec::new(),
            timings: Vec::new(),
        }
    }

    pub fn id(&self) -> CycleId {
        self.id
    }

    /// The next phase to run.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn blobs(&self) -> &BlobCatalog {
        &self.blobs
    }

    pub fn manifests(&self) -> &ManifestIndex {
        &self.manifests
    }

    /// Documents to fetch, available after DOCUMENT_FETCH_PLAN.
    pub fn plan(&self) -> &[Digest] {
        &self.plan
    }

    /// Orphans, available after ORPHAN_COMPUTE.
    pub fn orphans(&self) -> &OrphanSet {
        &self.orphans
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Run every phase to completion.
    pub fn run(mut self) -> CycleResult<CycleReport> {
        let span = info_span!("gc_cycle", id = %self.id);
        let _guard = span.enter();
        info!(dry_run = self.config.dry_run, "starting garbage collection cycle");

        self.inventory()?;
        self.scan_manifests()?;
        self.plan_documents()?;
        self.scan_documents()?;
        self.compute_orphans()?;
        self.reap()?;
        self.summarize()
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// INVENTORY: register blob and manifest files.
    pub fn inventory(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::Inventory)?;
        let config = self.config;
        let layout = &config.layout;
        let entries = self
            .backend
            .inventory()
            .map_err(CycleError::transport(Phase::Inventory))?;

        for entry in entries {
            if let Some(name) = entry.relative_to(&layout.blob_prefix) {
                match Digest::parse(name) {
                    Ok(digest) => {
                        self.blobs
                            .register_blob(digest, entry.path, entry.size, entry.modified_at)
                    }
                    Err(_) => {
                        warn!(
                            path = %entry.path,
                            "file under blob directory is not named by a digest, ignoring"
                        );
                        self.warnings
                            .push(Warning::UnrecognizedBlobFile { path: entry.path });
                    }
                }
            } else if entry.relative_to(&layout.manifest_prefix).is_some() {
                self.manifests.register_manifest(entry.path);
            }
        }

        info!(
            blobs = self.blobs.len(),
            manifests = self.manifests.len(),
            "inventory complete"
        );
        self.finish(Phase::Inventory, started);
        Ok(())
    }

    /// MANIFEST_SCAN: resolve each manifest to its document digest.
    pub fn scan_manifests(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::ManifestScan)?;
        for name in self.manifests.names() {
            let text = self
                .backend
                .manifest_text(&name)
                .map_err(CycleError::transport(Phase::ManifestScan))?;
            let outcome = mark_manifest(&mut self.manifests, &mut self.blobs, &name, &text)
                .map_err(CycleError::mark(Phase::ManifestScan))?;
            if let Some(outcome) = outcome {
                self.note(Referrer::Manifest(name), outcome);
            }
        }
        self.finish(Phase::ManifestScan, started);
        Ok(())
    }

    /// DOCUMENT_FETCH_PLAN: collect the distinct document digests present
    /// in the catalog.
    ///
    /// Fails if any manifest is still unresolved: without its target the
    /// mark set is incomplete.
    pub fn plan_documents(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::DocumentFetchPlan)?;
        let unresolved = self.manifests.unresolved();
        if !unresolved.is_empty() {
            let manifests: Vec<String> = unresolved.into_iter().map(str::to_string).collect();
            warn!(
                count = manifests.len(),
                first = %manifests[0],
                "no blob found for manifest, terminating cycle"
            );
            return Err(CycleError::FatalMissingReference { manifests });
        }

        // Targets missing from disk were already reported as dangling.
        let blobs = &self.blobs;
        let plan: Vec<Digest> = self
            .manifests
            .targets()
            .into_iter()
            .filter(|digest| blobs.contains(digest))
            .collect();
        self.plan = plan;
        if self.plan.is_empty() {
            info!("no documents to retrieve");
        } else {
            info!(documents = self.plan.len(), "documents planned for retrieval");
        }
        self.finish(Phase::DocumentFetchPlan, started);
        Ok(())
    }

    /// DOCUMENT_SCAN: mark every config and layer named by a planned document.
    pub fn scan_documents(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::DocumentScan)?;
        for digest in self.plan.clone() {
            let bytes = self
                .backend
                .document_bytes(&digest)
                .map_err(CycleError::transport(Phase::DocumentScan))?;
            let outcomes = mark_document(&mut self.blobs, &digest, &bytes)
                .map_err(CycleError::mark(Phase::DocumentScan))?;
            for outcome in outcomes {
                self.note(Referrer::Document(digest), outcome);
            }
        }
        self.finish(Phase::DocumentScan, started);
        Ok(())
    }

    /// ORPHAN_COMPUTE: select unreferenced blobs old enough to reclaim.
    pub fn compute_orphans(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::OrphanCompute)?;
        self.orphans = self.blobs.compute_orphans(self.config.min_blob_age, self.now);
        info!(
            orphans = self.orphans.len(),
            bytes = self.orphans.total_bytes(),
            min_age_secs = self.config.min_blob_age.as_secs(),
            "orphans computed"
        );
        self.finish(Phase::OrphanCompute, started);
        Ok(())
    }

    /// REAP: hand orphans to the deletion boundary.
    pub fn reap(&mut self) -> CycleResult<()> {
        let started = self.enter(Phase::Reap)?;
        if self.config.dry_run {
            info!("dry run, not actually deleting");
        }
        self.reap = self
            .blobs
            .reap(&self.orphans, self.config.dry_run, &mut *self.backend)
            .map_err(CycleError::catalog(Phase::Reap))?;
        self.finish(Phase::Reap, started);
        Ok(())
    }

    /// SUMMARY: produce the report and end the cycle.
    pub fn summarize(mut self) -> CycleResult<CycleReport> {
        let started = self.enter(Phase::Summary)?;
        let summary = self
            .blobs
            .summary(&self.manifests, self.config.min_blob_age, self.now);
        for line in summary.to_string().lines() {
            info!("{line}");
        }
        self.timings.push(PhaseTiming {
            phase: Phase::Summary,
            elapsed: started.elapsed(),
        });

        Ok(CycleReport {
            id: self.id,
            started_at: self.now,
            dry_run: self.config.dry_run,
            summary,
            reap: self.reap,
            warnings: self.warnings,
            timings: self.timings,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn enter(&self, requested: Phase) -> CycleResult<Instant> {
        if self.phase != requested {
            return Err(CycleError::OutOfOrder {
                current: self.phase,
                requested,
            });
        }
        debug!(phase = %requested, "entering phase");
        Ok(Instant::now())
    }

    fn finish(&mut self, phase: Phase, started: Instant) {
        self.timings.push(PhaseTiming {
            phase,
            elapsed: started.elapsed(),
        });
        if let Some(next) = phase.next() {
            self.phase = next;
        }
    }

    fn note(&mut self, referrer: Referrer, outcome: MentionOutcome) {
        if let MentionOutcome::Dangling(digest) = outcome {
            self.warnings
                .push(Warning::DanglingReference { referrer, digest });
        }
    }
}

/// Run one complete cycle against `backend`, using the current time.
pub fn run_cycle<B>(config: &GcConfig, backend: &mut B) -> CycleResult<CycleReport>
where
    B: RegistryBackend + ?Sized,
{
    GcCycle::new(config, backend, Utc::now()).run()
}
