//! Marker Surface
//!
//! The rendering target: a web map that shows one layer of icon markers per
//! world. The projector talks to it only through [`MarkerSurface`], handed in
//! at construction.

mod export;
mod memory;

pub use export::JsonExportSurface;
pub use memory::{LayerSnapshot, MemorySurface};

use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::types::{MapPoint, MarkerKey, SurfaceHandle};

// ─────────────────────────────────────────────────────────────────────────────
// Surface Types
// ─────────────────────────────────────────────────────────────────────────────

/// A world known to the map renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRegion {
    /// Renderer's own key for the world
    pub key: String,
    /// Display name
    pub display_name: String,
    /// Handle used for every later call about this world
    pub handle: SurfaceHandle,
}

/// Layer settings for the waystone layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub key: String,
    pub label: String,
    /// Order in the layer controls (lower = higher)
    pub priority: i32,
    /// Render order on the map (higher = on top)
    pub z_index: i32,
    pub show_controls: bool,
    pub default_hidden: bool,
    /// How often the browser re-polls the layer, in seconds
    pub update_interval_secs: u32,
}

impl LayerConfig {
    /// The single layer this addon registers in every world
    pub fn waystones() -> Self {
        Self {
            key: "waystones".to_string(),
            label: "Waystones".to_string(),
            priority: 10,
            z_index: 100,
            show_controls: true,
            default_hidden: false,
            update_interval_secs: 20,
        }
    }
}

/// Everything the surface needs to draw one icon marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Registered icon key
    pub icon: String,
    pub point: MapPoint,
    /// Icon edge length in pixels
    pub size: u32,
    /// HTML shown on hover
    pub hover_tooltip: String,
    /// HTML shown on click
    pub click_tooltip: String,
}

/// Icon image to register with the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub key: String,
    pub bytes: Vec<u8>,
    /// Image format, e.g. "png"
    pub format: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Surface Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Operations the map renderer exposes to this addon
///
/// Each region handle carries at most one waystone layer.
pub trait MarkerSurface: Send + Sync {
    /// Worlds the renderer currently has enabled
    fn list_regions(&self) -> Result<Vec<SurfaceRegion>, SurfaceError>;

    /// Register the waystone layer in a world. Replaces an existing one.
    fn register_layer(&self, handle: &SurfaceHandle, layer: &LayerConfig) -> Result<(), SurfaceError>;

    /// Whether the waystone layer is registered in a world
    fn has_layer(&self, handle: &SurfaceHandle) -> bool;

    /// Remove the waystone layer from a world
    fn unregister_layer(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError>;

    /// Remove every marker from a world's layer
    fn clear_markers(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError>;

    /// Add one marker to a world's layer
    fn add_marker(
        &self,
        handle: &SurfaceHandle,
        key: &MarkerKey,
        marker: &MarkerSpec,
    ) -> Result<(), SurfaceError>;

    /// Whether an icon is already registered
    fn has_icon(&self, key: &str) -> bool;

    /// Register an icon image
    fn register_icon(&self, icon: IconImage) -> Result<(), SurfaceError>;

    /// Called once a world's layer has been fully repopulated
    fn commit(&self, _handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        Ok(())
    }
}
