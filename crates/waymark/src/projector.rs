//! Marker Projector
//!
//! Keeps one marker set per bound world that mirrors the filtered catalog.
//! Every refresh replaces a world's set wholesale: the new markers are built
//! first, then the surface layer is cleared and repopulated.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{CatalogSource, Record};
use crate::directory::Directory;
use crate::error::{SyncError, SyncResult};
use crate::icons::IconSet;
use crate::marker::{MarkerFactory, marker_key};
use crate::surface::{LayerConfig, MarkerSpec, MarkerSurface};
use crate::types::{MarkerKey, RegionId, SurfaceHandle};

/// Default icon edge length in pixels
pub const DEFAULT_ICON_SIZE: u32 = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Bindings and Reports
// ─────────────────────────────────────────────────────────────────────────────

/// Association between a catalog world and its surface handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBinding {
    pub region: RegionId,
    pub display_name: String,
    pub handle: SurfaceHandle,
}

/// Outcome of refreshing every bound world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Worlds repopulated successfully
    pub refreshed: usize,
    /// Worlds whose refresh failed and were skipped
    pub failed: usize,
    /// Markers placed across all refreshed worlds
    pub markers: usize,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

struct BoundRegion {
    binding: RegionBinding,
    markers: BTreeMap<MarkerKey, MarkerSpec>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Projector
// ─────────────────────────────────────────────────────────────────────────────

/// Projects catalog records onto the marker surface, one layer per world
pub struct MarkerProjector {
    catalog: Arc<dyn CatalogSource>,
    surface: Arc<dyn MarkerSurface>,
    directory: Arc<dyn Directory>,
    factory: MarkerFactory,
    icons: IconSet,
    layer: LayerConfig,
    show_locked: bool,
    regions: BTreeMap<RegionId, BoundRegion>,
}

impl MarkerProjector {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        surface: Arc<dyn MarkerSurface>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            catalog,
            surface,
            directory,
            factory: MarkerFactory::new(DEFAULT_ICON_SIZE),
            icons: IconSet::new("icons"),
            layer: LayerConfig::waystones(),
            show_locked: true,
            regions: BTreeMap::new(),
        }
    }

    pub fn with_factory(mut self, factory: MarkerFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_icons(mut self, icons: IconSet) -> Self {
        self.icons = icons;
        self
    }

    /// Whether private waystones are drawn
    pub fn with_show_locked(mut self, show_locked: bool) -> Self {
        self.show_locked = show_locked;
        self
    }

    /// Change the visibility filter. Takes effect on the next refresh.
    pub fn set_show_locked(&mut self, show_locked: bool) {
        self.show_locked = show_locked;
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// Current marker set of a world
    pub fn markers(&self, region: &RegionId) -> Option<&BTreeMap<MarkerKey, MarkerSpec>> {
        self.regions.get(region).map(|r| &r.markers)
    }

    pub fn bound_regions(&self) -> Vec<RegionBinding> {
        self.regions.values().map(|r| r.binding.clone()).collect()
    }

    /// Register the waystone icons the surface does not have yet
    pub fn register_icons(&self) -> usize {
        self.icons.register(self.surface.as_ref())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bindings
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind every world the surface lists that maps to a catalog world.
    ///
    /// Worlds the directory cannot map are skipped with a warning. Returns
    /// the number of worlds bound.
    pub fn bind_surface_regions(&mut self) -> SyncResult<usize> {
        let surface_regions = self.surface.list_regions().map_err(SyncError::ListRegions)?;

        let mut bound = 0;
        for surface_region in surface_regions {
            let Some(region) = self.directory.region_for_surface(&surface_region.key) else {
                tracing::warn!(
                    world = %surface_region.key,
                    "Map world has no matching waystone world, skipping"
                );
                continue;
            };

            match self.register_region(region, surface_region.display_name, surface_region.handle) {
                Ok(()) => bound += 1,
                Err(e) => {
                    tracing::warn!(world = %surface_region.key, error = %e, "Failed to bind world");
                }
            }
        }

        Ok(bound)
    }

    /// Bind a world to a surface handle and register its layer.
    ///
    /// Re-registering a bound world clears its previous markers first.
    pub fn register_region(
        &mut self,
        region: RegionId,
        display_name: impl Into<String>,
        handle: SurfaceHandle,
    ) -> SyncResult<()> {
        let display_name = display_name.into();

        if let Some(previous) = self.regions.remove(&region) {
            let old = &previous.binding.handle;
            if let Err(e) = self.surface.clear_markers(old) {
                tracing::debug!(region = %region, error = %e, "Previous layer not cleared");
            }
            if old != &handle {
                if let Err(e) = self.surface.unregister_layer(old) {
                    tracing::debug!(region = %region, error = %e, "Previous layer not unregistered");
                }
            }
        }

        self.surface
            .register_layer(&handle, &self.layer)
            .map_err(|e| SyncError::surface(&region, e))?;

        tracing::info!(region = %region, "Registered waystone layer for world: {}", display_name);

        self.regions.insert(
            region.clone(),
            BoundRegion {
                binding: RegionBinding {
                    region,
                    display_name,
                    handle,
                },
                markers: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Unbind a world, clearing and removing its layer.
    ///
    /// Unknown worlds are ignored. Returns whether the world was bound.
    pub fn unregister_region(&mut self, region: &RegionId) -> bool {
        let Some(bound) = self.regions.remove(region) else {
            return false;
        };

        let handle = &bound.binding.handle;
        if let Err(e) = self.surface.clear_markers(handle) {
            tracing::debug!(region = %region, error = %e, "Layer not cleared");
        }
        if let Err(e) = self.surface.unregister_layer(handle) {
            tracing::warn!(region = %region, error = %e, "Failed to unregister waystone layer");
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Repopulate one world from a fresh catalog fetch
    pub fn refresh_region(&mut self, region: &RegionId) -> SyncResult<usize> {
        if !self.regions.contains_key(region) {
            return Err(SyncError::UnboundRegion(region.clone()));
        }
        let records = self.catalog.fetch_all()?;
        self.project_region(region, &records)
    }

    /// Repopulate every bound world from one catalog fetch.
    ///
    /// A failing world is logged and skipped.
    pub fn refresh_all(&mut self) -> SyncResult<RefreshReport> {
        let records = self.catalog.fetch_all()?;
        Ok(self.project_all(&records))
    }

    /// Repopulate every bound world from an already fetched snapshot
    pub(crate) fn project_all(&mut self, records: &[Record]) -> RefreshReport {
        let unmapped = records
            .iter()
            .filter(|r| !self.regions.contains_key(&r.region))
            .count();
        if unmapped > 0 {
            tracing::debug!(count = unmapped, "Waystones in unmapped worlds left out");
        }

        let regions: Vec<RegionId> = self.regions.keys().cloned().collect();
        let mut report = RefreshReport::default();

        for region in regions {
            match self.project_region(&region, records) {
                Ok(placed) => {
                    report.refreshed += 1;
                    report.markers += placed;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(region = %region, error = %e, "Failed to refresh waystone markers");
                }
            }
        }

        report
    }

    fn project_region(&mut self, region: &RegionId, records: &[Record]) -> SyncResult<usize> {
        let Some(bound) = self.regions.get(region) else {
            return Err(SyncError::UnboundRegion(region.clone()));
        };
        let handle = bound.binding.handle.clone();
        let display_name = bound.binding.display_name.clone();

        let built: Vec<(MarkerKey, MarkerSpec)> = records
            .iter()
            .filter(|r| &r.region == region)
            .filter(|r| self.show_locked || !r.locked)
            .map(|r| (marker_key(&r.id), self.factory.build(r, self.directory.as_ref())))
            .collect();

        if !self.surface.has_layer(&handle) {
            tracing::debug!(region = %region, "Waystone layer missing, registering again");
            self.surface
                .register_layer(&handle, &self.layer)
                .map_err(|e| SyncError::surface(region, e))?;
        }

        self.surface
            .clear_markers(&handle)
            .map_err(|e| SyncError::surface(region, e))?;

        let mut placed = BTreeMap::new();
        for (key, spec) in built {
            match self.surface.add_marker(&handle, &key, &spec) {
                Ok(()) => {
                    placed.insert(key, spec);
                }
                Err(e) => {
                    tracing::warn!(region = %region, marker = %key, error = %e, "Marker rejected");
                }
            }
        }

        let count = placed.len();
        if let Some(bound) = self.regions.get_mut(region) {
            bound.markers = placed;
        }

        self.surface
            .commit(&handle)
            .map_err(|e| SyncError::surface(region, e))?;

        tracing::info!(
            region = %region,
            "Refreshed {} waystone marker(s) for world: {}",
            count,
            display_name
        );
        Ok(count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild everything after the map renderer reloaded and dropped its
    /// layers and icons
    pub fn reattach(&mut self) -> SyncResult<RefreshReport> {
        self.rebind()?;
        self.refresh_all()
    }

    /// Register icons and layers again without drawing markers.
    ///
    /// Worlds the renderer no longer lists are unbound, new ones are bound.
    pub fn rebind(&mut self) -> SyncResult<usize> {
        self.register_icons();

        let listed: Vec<SurfaceHandle> = self
            .surface
            .list_regions()
            .map_err(SyncError::ListRegions)?
            .into_iter()
            .map(|r| r.handle)
            .collect();

        let vanished: Vec<RegionId> = self
            .regions
            .values()
            .filter(|r| !listed.contains(&r.binding.handle))
            .map(|r| r.binding.region.clone())
            .collect();
        for region in vanished {
            tracing::info!(region = %region, "World no longer on the map, unbinding");
            self.regions.remove(&region);
        }

        self.bind_surface_regions()
    }

    /// Unbind every world
    pub fn shutdown(&mut self) {
        let regions: Vec<RegionId> = self.regions.keys().cloned().collect();
        let count = regions.len();
        for region in regions {
            self.unregister_region(&region);
        }
        tracing::info!(count, "Unregistered waystone layers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, record};
    use crate::types::MapPoint;

    fn region(id: &str) -> RegionId {
        RegionId::new(id)
    }

    #[test]
    fn test_binds_mapped_worlds_only() {
        let fixture = Fixture::new(vec![]);
        fixture.surface.inner.add_region("C", "Unmapped");

        let mut projector = fixture.unbound_projector();
        assert_eq!(projector.bind_surface_regions().unwrap(), 2);

        let bound: Vec<RegionId> = projector.bound_regions().into_iter().map(|b| b.region).collect();
        assert_eq!(bound, vec![region("A"), region("B")]);
        assert!(fixture.surface.has_layer(&SurfaceHandle::new("A")));
        assert!(!fixture.surface.has_layer(&SurfaceHandle::new("C")));
    }

    #[test]
    fn test_partition_by_region() {
        let fixture = Fixture::new(vec![
            record("1", "A", 10, 64, 20),
            record("2", "B", 0, 70, 0),
            record("3", "A", -5, 12, 9),
            record("4", "elsewhere", 1, 1, 1),
        ]);
        let mut projector = fixture.projector();

        let report = projector.refresh_all().unwrap();

        assert_eq!(fixture.catalog.fetches(), 1);
        assert_eq!(
            report,
            RefreshReport {
                refreshed: 2,
                failed: 0,
                markers: 3
            }
        );
        let a: Vec<&str> = projector.markers(&region("A")).unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(a, vec!["waystone_1", "waystone_3"]);
        let b: Vec<&str> = projector.markers(&region("B")).unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(b, vec!["waystone_2"]);
        assert_eq!(fixture.surface.markers("A").len(), 2);
        assert_eq!(fixture.surface.commits("A"), 1);
    }

    #[test]
    fn test_visibility_filter() {
        let fixture = Fixture::new(vec![
            record("1", "A", 0, 0, 0),
            record("2", "A", 1, 0, 1).locked(true),
        ]);
        let mut projector = fixture.projector().with_show_locked(false);

        projector.refresh_all().unwrap();
        let keys: Vec<&str> = projector.markers(&region("A")).unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["waystone_1"]);

        projector.set_show_locked(true);
        projector.refresh_all().unwrap();
        assert_eq!(projector.markers(&region("A")).unwrap().len(), 2);
    }

    #[test]
    fn test_refresh_region_is_idempotent() {
        let fixture = Fixture::new(vec![record("1", "A", 10, 64, 20), record("2", "A", 3, 4, 5)]);
        let mut projector = fixture.projector();

        projector.refresh_region(&region("A")).unwrap();
        let first = projector.markers(&region("A")).unwrap().clone();
        projector.refresh_region(&region("A")).unwrap();
        let second = projector.markers(&region("A")).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(fixture.surface.markers("A"), second);
        assert_eq!(fixture.surface.commits("A"), 2);
    }

    #[test]
    fn test_failed_region_does_not_stop_others() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0), record("2", "B", 0, 0, 0)]);
        let mut projector = fixture.projector();
        fixture.surface.break_region("A");

        let report = projector.refresh_all().unwrap();

        assert_eq!(report.refreshed, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_complete());
        assert_eq!(fixture.surface.markers("B").len(), 1);
        assert!(projector.markers(&region("A")).unwrap().is_empty());
    }

    #[test]
    fn test_rejected_marker_left_out() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0), record("2", "A", 1, 1, 1)]);
        let mut projector = fixture.projector();
        fixture.surface.reject_marker("waystone_2");

        assert_eq!(projector.refresh_region(&region("A")).unwrap(), 1);
        assert!(!projector.markers(&region("A")).unwrap().contains_key(&MarkerKey::new("waystone_2")));
    }

    #[test]
    fn test_refresh_unbound_region() {
        let fixture = Fixture::new(vec![]);
        let mut projector = fixture.unbound_projector();
        assert!(matches!(
            projector.refresh_region(&region("A")),
            Err(SyncError::UnboundRegion(_))
        ));
    }

    #[test]
    fn test_fetch_failure_aborts_refresh() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0)]);
        let mut projector = fixture.projector();
        projector.refresh_all().unwrap();
        fixture.catalog.set_failing(true);

        assert!(matches!(projector.refresh_all(), Err(SyncError::Catalog(_))));
        // previous markers untouched
        assert_eq!(fixture.surface.markers("A").len(), 1);
    }

    #[test]
    fn test_reregister_clears_previous_markers() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0)]);
        let mut projector = fixture.projector();
        projector.refresh_all().unwrap();

        projector
            .register_region(region("A"), "Alpha", SurfaceHandle::new("A"))
            .unwrap();

        assert!(fixture.surface.markers("A").is_empty());
        assert!(projector.markers(&region("A")).unwrap().is_empty());
        assert_eq!(projector.bound_regions().len(), 2);
    }

    #[test]
    fn test_unregister_region() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0)]);
        let mut projector = fixture.projector();
        projector.refresh_all().unwrap();

        assert!(projector.unregister_region(&region("A")));
        assert!(!fixture.surface.has_layer(&SurfaceHandle::new("A")));
        assert!(projector.markers(&region("A")).is_none());

        // unknown is a no-op
        assert!(!projector.unregister_region(&region("A")));
        assert!(!projector.unregister_region(&region("Z")));
    }

    #[test]
    fn test_reattach_after_renderer_reload() {
        let fixture = Fixture::new(vec![record("1", "A", 10, 64, 20), record("2", "B", 1, 2, 3)]);
        let mut projector = fixture.projector();
        projector.refresh_all().unwrap();

        fixture.surface.inner.reload();
        fixture.surface.inner.remove_region("B");

        let report = projector.reattach().unwrap();

        assert_eq!(report.refreshed, 1);
        assert_eq!(projector.bound_regions().len(), 1);
        let markers = fixture.surface.markers("A");
        assert_eq!(markers[&MarkerKey::new("waystone_1")].point, MapPoint { x: 10.0, z: 20.0 });
    }

    #[test]
    fn test_shutdown_unbinds_everything() {
        let fixture = Fixture::new(vec![record("1", "A", 0, 0, 0)]);
        let mut projector = fixture.projector();
        projector.refresh_all().unwrap();

        projector.shutdown();

        assert!(projector.bound_regions().is_empty());
        assert!(!fixture.surface.has_layer(&SurfaceHandle::new("A")));
        assert!(!fixture.surface.has_layer(&SurfaceHandle::new("B")));
    }
}
