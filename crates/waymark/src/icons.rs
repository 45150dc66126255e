//! Waystone icon images and their registration with the surface.

use std::path::PathBuf;

use crate::surface::{IconImage, MarkerSurface};

/// Icon for public waystones
pub const OPEN_ICON_KEY: &str = "waystone_icon";
/// Icon for private waystones
pub const RESTRICTED_ICON_KEY: &str = "waystone_locked_icon";

const OPEN_ICON_FILE: &str = "waystone_icon.png";
const RESTRICTED_ICON_FILE: &str = "waystone_locked_icon.png";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// The two waystone icons, loaded from a directory
#[derive(Debug, Clone)]
pub struct IconSet {
    dir: PathBuf,
}

impl IconSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Register both icons that the surface does not have yet.
    ///
    /// A missing or unreadable image is logged and skipped; markers keep
    /// referring to its key. Returns the number of icons registered.
    pub fn register(&self, surface: &dyn MarkerSurface) -> usize {
        [
            (OPEN_ICON_KEY, OPEN_ICON_FILE, "waystone icon"),
            (RESTRICTED_ICON_KEY, RESTRICTED_ICON_FILE, "locked waystone icon"),
        ]
        .into_iter()
        .filter(|(key, file, description)| self.register_one(surface, key, file, description))
        .count()
    }

    fn register_one(
        &self,
        surface: &dyn MarkerSurface,
        key: &str,
        file: &str,
        description: &str,
    ) -> bool {
        if surface.has_icon(key) {
            return false;
        }

        let path = self.dir.join(file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Icon image not found");
                return false;
            }
        };

        if !bytes.starts_with(&PNG_SIGNATURE) {
            tracing::warn!(path = %path.display(), "Icon image is not a PNG");
            return false;
        }

        let icon = IconImage {
            key: key.to_string(),
            bytes,
            format: "png".to_string(),
        };
        match surface.register_icon(icon) {
            Ok(()) => {
                tracing::info!("Registered {}", description);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register {}", description);
                false
            }
        }
    }
}
