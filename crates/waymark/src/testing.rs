//! Shared fixtures for unit tests: collaborators that can be told to fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::catalog::{CatalogSource, MemoryCatalog, Record};
use crate::directory::StaticDirectory;
use crate::error::{CatalogError, SurfaceError};
use crate::projector::MarkerProjector;
use crate::surface::{IconImage, LayerConfig, MarkerSpec, MarkerSurface, MemorySurface, SurfaceRegion};
use crate::types::{MarkerKey, Position, SurfaceHandle};

pub(crate) fn record(id: &str, region: &str, x: i32, y: i32, z: i32) -> Record {
    Record::new(id, format!("Waystone {}", id), Position::new(x, y, z), region, "u1")
}

/// Catalog that counts fetches and can be switched into failure
pub(crate) struct FlakyCatalog {
    pub inner: MemoryCatalog,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl FlakyCatalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: MemoryCatalog::new(records),
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl CatalogSource for FlakyCatalog {
    fn fetch_all(&self) -> Result<Vec<Record>, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog offline".into()));
        }
        self.inner.fetch_all()
    }
}

/// Memory surface that can refuse to clear a region or accept a marker
#[derive(Default)]
pub(crate) struct FlakySurface {
    pub inner: MemorySurface,
    broken: Mutex<HashSet<SurfaceHandle>>,
    rejected: Mutex<HashSet<MarkerKey>>,
}

impl FlakySurface {
    pub fn break_region(&self, handle: &str) {
        self.broken.lock().insert(SurfaceHandle::new(handle));
    }

    pub fn reject_marker(&self, key: &str) {
        self.rejected.lock().insert(MarkerKey::new(key));
    }

    pub fn markers(&self, handle: &str) -> BTreeMap<MarkerKey, MarkerSpec> {
        self.inner.markers(&SurfaceHandle::new(handle))
    }

    pub fn commits(&self, handle: &str) -> usize {
        self.inner
            .layer(&SurfaceHandle::new(handle))
            .map(|l| l.commits)
            .unwrap_or_default()
    }
}

impl MarkerSurface for FlakySurface {
    fn list_regions(&self) -> Result<Vec<SurfaceRegion>, SurfaceError> {
        self.inner.list_regions()
    }

    fn register_layer(&self, handle: &SurfaceHandle, layer: &LayerConfig) -> Result<(), SurfaceError> {
        self.inner.register_layer(handle, layer)
    }

    fn has_layer(&self, handle: &SurfaceHandle) -> bool {
        self.inner.has_layer(handle)
    }

    fn unregister_layer(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.inner.unregister_layer(handle)
    }

    fn clear_markers(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        if self.broken.lock().contains(handle) {
            return Err(SurfaceError::Rejected(format!("region {} is broken", handle)));
        }
        self.inner.clear_markers(handle)
    }

    fn add_marker(
        &self,
        handle: &SurfaceHandle,
        key: &MarkerKey,
        marker: &MarkerSpec,
    ) -> Result<(), SurfaceError> {
        if self.rejected.lock().contains(key) {
            return Err(SurfaceError::Rejected(format!("marker {} refused", key)));
        }
        self.inner.add_marker(handle, key, marker)
    }

    fn has_icon(&self, key: &str) -> bool {
        self.inner.has_icon(key)
    }

    fn register_icon(&self, icon: IconImage) -> Result<(), SurfaceError> {
        self.inner.register_icon(icon)
    }

    fn commit(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.inner.commit(handle)
    }
}

/// Catalog, surface and directory with worlds "A" (Alpha) and "B" (Beta)
pub(crate) struct Fixture {
    pub catalog: Arc<FlakyCatalog>,
    pub surface: Arc<FlakySurface>,
    pub directory: Arc<StaticDirectory>,
}

impl Fixture {
    pub fn new(records: Vec<Record>) -> Self {
        let surface = FlakySurface::default();
        surface.inner.add_region("A", "Alpha");
        surface.inner.add_region("B", "Beta");

        let directory = StaticDirectory::default()
            .with_world("A", "Alpha", None)
            .with_world("B", "Beta", None)
            .with_owner("u1", "Steve");

        Self {
            catalog: Arc::new(FlakyCatalog::new(records)),
            surface: Arc::new(surface),
            directory: Arc::new(directory),
        }
    }

    /// Projector over this fixture, with both worlds bound
    pub fn projector(&self) -> MarkerProjector {
        let mut projector = self.unbound_projector();
        projector
            .bind_surface_regions()
            .expect("fixture regions bind");
        projector
    }

    pub fn unbound_projector(&self) -> MarkerProjector {
        MarkerProjector::new(
            self.catalog.clone(),
            self.surface.clone(),
            self.directory.clone(),
        )
    }
}
