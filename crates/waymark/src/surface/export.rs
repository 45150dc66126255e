//! JSON export surface
//!
//! Keeps layers in memory and writes each world's layer to
//! `<dir>/<world>.json` whenever it is committed, for a static web map to
//! pick up. Icons are written to `<dir>/icons/<key>.<format>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{IconImage, LayerConfig, MarkerSpec, MarkerSurface, MemorySurface, SurfaceRegion};
use crate::error::SurfaceError;
use crate::types::{MarkerKey, SurfaceHandle};

/// Marker surface that exports layers as JSON files
pub struct JsonExportSurface {
    dir: PathBuf,
    inner: MemorySurface,
}

impl JsonExportSurface {
    /// Create the export directory and enable the given worlds
    pub fn new<I, K, N>(dir: impl AsRef<Path>, worlds: I) -> Result<Self, SurfaceError>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let inner = MemorySurface::new();
        for (key, name) in worlds {
            inner.add_region(key, name);
        }

        Ok(Self { dir, inner })
    }

    fn layer_path(&self, handle: &SurfaceHandle) -> PathBuf {
        self.dir.join(format!("{}.json", handle))
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SurfaceError> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl MarkerSurface for JsonExportSurface {
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
        self.inner.unregister_layer(handle)?;
        match std::fs::remove_file(self.layer_path(handle)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn clear_markers(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.inner.clear_markers(handle)
    }

    fn add_marker(
        &self,
        handle: &SurfaceHandle,
        key: &MarkerKey,
        marker: &MarkerSpec,
    ) -> Result<(), SurfaceError> {
        self.inner.add_marker(handle, key, marker)
    }

    fn has_icon(&self, key: &str) -> bool {
        self.inner.has_icon(key)
    }

    fn register_icon(&self, icon: IconImage) -> Result<(), SurfaceError> {
        let icons_dir = self.dir.join("icons");
        std::fs::create_dir_all(&icons_dir)?;
        Self::write_atomic(
            &icons_dir.join(format!("{}.{}", icon.key, icon.format)),
            &icon.bytes,
        )?;
        self.inner.register_icon(icon)
    }

    fn commit(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        let snapshot = self
            .inner
            .layer(handle)
            .ok_or_else(|| SurfaceError::NoLayer(handle.clone()))?;
        let json = serde_json::to_vec_pretty(&snapshot)?;
        Self::write_atomic(&self.layer_path(handle), &json)?;
        self.inner.commit(handle)?;

        tracing::debug!(
            region = %handle,
            markers = snapshot.markers.len(),
            "Exported layer"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MapPoint;

    #[test]
    fn test_commit_writes_layer_file() {
        let dir = tempfile::tempdir().unwrap();
        let surface = JsonExportSurface::new(dir.path().join("out"), [("world", "Overworld")]).unwrap();
        let handle = SurfaceHandle::new("world");

        surface.register_layer(&handle, &LayerConfig::waystones()).unwrap();
        surface
            .add_marker(
                &handle,
                &MarkerKey::new("waystone_1"),
                &MarkerSpec {
                    icon: "waystone_icon".into(),
                    point: MapPoint { x: 10.0, z: 20.0 },
                    size: 16,
                    hover_tooltip: "<b>Spawn</b>".into(),
                    click_tooltip: "<div>Spawn</div>".into(),
                },
            )
            .unwrap();
        surface.commit(&handle).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("out/world.json")).unwrap()).unwrap();
        assert_eq!(written["layer"]["key"], "waystones");
        assert_eq!(written["markers"]["waystone_1"]["point"]["x"], 10.0);
        assert_eq!(written["markers"]["waystone_1"]["icon"], "waystone_icon");

        surface.unregister_layer(&handle).unwrap();
        assert!(!dir.path().join("out/world.json").exists());
    }

    #[test]
    fn test_icons_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let surface = JsonExportSurface::new(dir.path(), Vec::<(String, String)>::new()).unwrap();

        surface
            .register_icon(IconImage {
                key: "waystone_icon".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
                format: "png".into(),
            })
            .unwrap();

        assert!(surface.has_icon("waystone_icon"));
        assert_eq!(
            std::fs::read(dir.path().join("icons/waystone_icon.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }
}
