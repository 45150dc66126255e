//! In-memory marker surface
//!
//! Holds layers, markers and icons in process. Used for headless runs, as
//! the backing store of the JSON export surface, and in tests.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::Serialize;

use super::{IconImage, LayerConfig, MarkerSpec, MarkerSurface, SurfaceRegion};
use crate::error::SurfaceError;
use crate::types::{MarkerKey, SurfaceHandle};

/// Point-in-time copy of one world's layer
#[derive(Debug, Clone, Serialize)]
pub struct LayerSnapshot {
    pub layer: LayerConfig,
    pub markers: BTreeMap<MarkerKey, MarkerSpec>,
    /// Number of completed repopulations
    #[serde(skip)]
    pub commits: usize,
}

#[derive(Default)]
struct State {
    regions: Vec<SurfaceRegion>,
    layers: HashMap<SurfaceHandle, LayerSnapshot>,
    icons: HashMap<String, IconImage>,
}

impl State {
    fn ensure_region(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        if self.regions.iter().any(|r| &r.handle == handle) {
            Ok(())
        } else {
            Err(SurfaceError::UnknownHandle(handle.clone()))
        }
    }

    fn layer_mut(&mut self, handle: &SurfaceHandle) -> Result<&mut LayerSnapshot, SurfaceError> {
        self.ensure_region(handle)?;
        self.layers
            .get_mut(handle)
            .ok_or_else(|| SurfaceError::NoLayer(handle.clone()))
    }
}

/// Marker surface kept entirely in memory
#[derive(Default)]
pub struct MemorySurface {
    state: RwLock<State>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemorySurface::add_region`]
    pub fn with_region(self, key: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.add_region(key, display_name);
        self
    }

    /// Enable a world. Its handle is its key.
    pub fn add_region(&self, key: impl Into<String>, display_name: impl Into<String>) -> SurfaceHandle {
        let key = key.into();
        let handle = SurfaceHandle::new(key.clone());
        let mut state = self.state.write();
        state.regions.retain(|r| r.key != key);
        state.regions.push(SurfaceRegion {
            key,
            display_name: display_name.into(),
            handle: handle.clone(),
        });
        handle
    }

    /// Disable a world, dropping its layer
    pub fn remove_region(&self, key: &str) {
        let mut state = self.state.write();
        let removed: Vec<SurfaceHandle> = state
            .regions
            .iter()
            .filter(|r| r.key == key)
            .map(|r| r.handle.clone())
            .collect();
        state.regions.retain(|r| r.key != key);
        for handle in removed {
            state.layers.remove(&handle);
        }
    }

    /// Simulate a renderer reload: every layer and icon is dropped
    pub fn reload(&self) {
        let mut state = self.state.write();
        state.layers.clear();
        state.icons.clear();
    }

    pub fn layer(&self, handle: &SurfaceHandle) -> Option<LayerSnapshot> {
        self.state.read().layers.get(handle).cloned()
    }

    /// Markers currently in a world's layer (empty when there is no layer)
    pub fn markers(&self, handle: &SurfaceHandle) -> BTreeMap<MarkerKey, MarkerSpec> {
        self.layer(handle).map(|l| l.markers).unwrap_or_default()
    }

    pub fn icon(&self, key: &str) -> Option<IconImage> {
        self.state.read().icons.get(key).cloned()
    }

    pub fn icon_count(&self) -> usize {
        self.state.read().icons.len()
    }
}

impl MarkerSurface for MemorySurface {
    fn list_regions(&self) -> Result<Vec<SurfaceRegion>, SurfaceError> {
        Ok(self.state.read().regions.clone())
    }

    fn register_layer(&self, handle: &SurfaceHandle, layer: &LayerConfig) -> Result<(), SurfaceError> {
        let mut state = self.state.write();
        state.ensure_region(handle)?;
        state.layers.insert(
            handle.clone(),
            LayerSnapshot {
                layer: layer.clone(),
                markers: BTreeMap::new(),
                commits: 0,
            },
        );
        Ok(())
    }

    fn has_layer(&self, handle: &SurfaceHandle) -> bool {
        self.state.read().layers.contains_key(handle)
    }

    fn unregister_layer(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        let mut state = self.state.write();
        state
            .layers
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| SurfaceError::NoLayer(handle.clone()))
    }

    fn clear_markers(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.state.write().layer_mut(handle)?.markers.clear();
        Ok(())
    }

    fn add_marker(
        &self,
        handle: &SurfaceHandle,
        key: &MarkerKey,
        marker: &MarkerSpec,
    ) -> Result<(), SurfaceError> {
        self.state
            .write()
            .layer_mut(handle)?
            .markers
            .insert(key.clone(), marker.clone());
        Ok(())
    }

    fn has_icon(&self, key: &str) -> bool {
        self.state.read().icons.contains_key(key)
    }

    fn register_icon(&self, icon: IconImage) -> Result<(), SurfaceError> {
        self.state.write().icons.insert(icon.key.clone(), icon);
        Ok(())
    }

    fn commit(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.state.write().layer_mut(handle)?.commits += 1;
        Ok(())
    }
}
