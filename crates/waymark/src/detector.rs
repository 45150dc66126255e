//! Change Detector
//!
//! Polls the catalog and compares a fingerprint of the whole snapshot with
//! the one taken at the last refresh. The catalog never announces changes,
//! so this is the only way staleness is noticed. Two different snapshots
//! hashing to the same fingerprint go unnoticed until the next real change.

use std::sync::Arc;

use crate::catalog::{CatalogSource, Fingerprint};
use crate::error::SyncResult;
use crate::projector::{MarkerProjector, RefreshReport};

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Catalog matched the baseline
    Unchanged,
    /// Catalog changed and every world was refreshed
    Refreshed(RefreshReport),
}

impl TickOutcome {
    pub fn refreshed(&self) -> bool {
        matches!(self, TickOutcome::Refreshed(_))
    }
}

/// Detects catalog changes by fingerprint
pub struct ChangeDetector {
    catalog: Arc<dyn CatalogSource>,
    baseline: Option<Fingerprint>,
}

impl ChangeDetector {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            catalog,
            baseline: None,
        }
    }

    /// Fingerprint recorded at the last refresh
    pub fn baseline(&self) -> Option<Fingerprint> {
        self.baseline
    }

    /// Record the current catalog as the baseline without refreshing.
    ///
    /// On failure the baseline stays unset, so the first successful tick
    /// refreshes.
    pub fn initialize(&mut self) -> SyncResult<Fingerprint> {
        let records = self.catalog.fetch_all()?;
        let fingerprint = Fingerprint::of(&records);
        self.baseline = Some(fingerprint);
        tracing::debug!(%fingerprint, records = records.len(), "Recorded catalog baseline");
        Ok(fingerprint)
    }

    /// Refresh every world if the catalog changed since the baseline.
    ///
    /// A failed fetch aborts the tick and leaves the baseline alone.
    pub fn tick(&mut self, projector: &mut MarkerProjector) -> SyncResult<TickOutcome> {
        let records = self.catalog.fetch_all()?;
        let fingerprint = Fingerprint::of(&records);

        if self.baseline == Some(fingerprint) {
            tracing::trace!(%fingerprint, "Catalog unchanged");
            return Ok(TickOutcome::Unchanged);
        }

        tracing::info!("Waystone changes detected, refreshing markers...");
        let report = projector.project_all(&records);
        self.baseline = Some(fingerprint);
        Ok(TickOutcome::Refreshed(report))
    }

    /// Refresh every world regardless of the baseline, then move the
    /// baseline to the snapshot that was projected
    pub fn force_refresh(&mut self, projector: &mut MarkerProjector) -> SyncResult<RefreshReport> {
        let records = self.catalog.fetch_all()?;
        let report = projector.project_all(&records);
        self.baseline = Some(Fingerprint::of(&records));
        Ok(report)
    }
}
