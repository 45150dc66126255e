//! Sync Engine
//!
//! Holds the change detector and the marker projector behind one lock so
//! that refresh cycles started from the timer, an operator command or a
//! renderer reload never interleave. Cloning the engine shares the state.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::Fingerprint;
use crate::detector::{ChangeDetector, TickOutcome};
use crate::error::{SyncError, SyncResult};
use crate::projector::{MarkerProjector, RefreshReport, RegionBinding};
use crate::surface::MarkerSpec;
use crate::types::{MarkerKey, RegionId};

struct EngineState {
    detector: ChangeDetector,
    projector: MarkerProjector,
    shut_down: bool,
}

impl EngineState {
    fn live(&mut self) -> SyncResult<&mut Self> {
        if self.shut_down {
            Err(SyncError::ShutDown)
        } else {
            Ok(self)
        }
    }
}

/// Serialised access to the detector and projector
#[derive(Clone)]
pub struct SyncEngine {
    state: Arc<Mutex<EngineState>>,
}

impl SyncEngine {
    /// Wrap a projector. The detector polls the projector's catalog.
    pub fn new(projector: MarkerProjector) -> Self {
        let detector = ChangeDetector::new(projector.catalog().clone());
        Self {
            state: Arc::new(Mutex::new(EngineState {
                detector,
                projector,
                shut_down: false,
            })),
        }
    }

    /// Register icons, bind every map world and draw the initial markers.
    ///
    /// A catalog that cannot be read yet leaves the baseline unset; the
    /// first successful tick then draws everything.
    pub fn initialize(&self) -> SyncResult<RefreshReport> {
        let mut guard = self.state.lock();
        let state = guard.live()?;

        state.projector.register_icons();
        let bound = state.projector.bind_surface_regions()?;
        tracing::info!(worlds = bound, "Bound waystone layers");

        match state.detector.force_refresh(&mut state.projector) {
            Ok(report) => Ok(report),
            Err(SyncError::Catalog(e)) => {
                tracing::warn!(error = %e, "Initial waystone load failed, waiting for next refresh");
                Ok(RefreshReport::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh if the catalog changed since the last refresh
    pub fn tick(&self) -> SyncResult<TickOutcome> {
        let mut guard = self.state.lock();
        let state = guard.live()?;
        state.detector.tick(&mut state.projector)
    }

    /// Refresh every world now
    pub fn force_refresh(&self) -> SyncResult<RefreshReport> {
        let mut guard = self.state.lock();
        let state = guard.live()?;
        state.detector.force_refresh(&mut state.projector)
    }

    /// Refresh a single world. The baseline is not moved.
    pub fn refresh_region(&self, region: &RegionId) -> SyncResult<usize> {
        let mut guard = self.state.lock();
        let state = guard.live()?;
        state.projector.refresh_region(region)
    }

    /// Rebuild layers after the map renderer reloaded.
    ///
    /// The markers are drawn from the same snapshot that becomes the new
    /// baseline.
    pub fn reattach(&self) -> SyncResult<RefreshReport> {
        let mut guard = self.state.lock();
        let state = guard.live()?;
        let bound = state.projector.rebind()?;
        tracing::debug!(worlds = bound, "Waystone layers bound again");
        state.detector.force_refresh(&mut state.projector)
    }

    /// Change the visibility filter; applies from the next refresh on
    pub fn set_show_locked(&self, show_locked: bool) {
        self.state.lock().projector.set_show_locked(show_locked);
    }

    /// Copy of a world's current marker set
    pub fn markers(&self, region: &RegionId) -> Option<BTreeMap<MarkerKey, MarkerSpec>> {
        self.state.lock().projector.markers(region).cloned()
    }

    pub fn bound_regions(&self) -> Vec<RegionBinding> {
        self.state.lock().projector.bound_regions()
    }

    pub fn baseline(&self) -> Option<Fingerprint> {
        self.state.lock().detector.baseline()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Unbind every world. Later refreshes fail with [`SyncError::ShutDown`].
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        state.projector.shutdown();
    }
}
