//! Name and Region Directory
//!
//! Resolves what the catalog only knows by id: player names, world names,
//! and which catalog world a map-renderer world corresponds to.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::types::{OwnerId, RegionId};

/// Lookup service supplied by the host
pub trait Directory: Send + Sync {
    /// Catalog region shown by the surface region with this key, if any
    fn region_for_surface(&self, surface_key: &str) -> Option<RegionId>;

    /// Display name of a catalog region
    fn region_name(&self, region: &RegionId) -> Option<String>;

    /// Display name of a player
    fn owner_name(&self, owner: &OwnerId) -> Option<String>;
}

/// One world as described in a world file
#[derive(Debug, Clone, Deserialize)]
pub struct WorldEntry {
    /// Key the map renderer uses for this world
    pub key: String,
    /// Display name
    pub name: String,
    /// Catalog region id; defaults to `key`
    #[serde(default)]
    pub region: Option<RegionId>,
}

impl WorldEntry {
    pub fn region_id(&self) -> RegionId {
        self.region
            .clone()
            .unwrap_or_else(|| RegionId::new(self.key.clone()))
    }
}

/// Directory backed by fixed tables
///
/// Loaded from a TOML world file:
///
/// ```toml
/// [[worlds]]
/// key = "world"
/// name = "Overworld"
/// region = "5b1e0c1a"   # optional, defaults to key
///
/// [owners]
/// "069a79f4" = "Notch"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticDirectory {
    #[serde(default)]
    pub worlds: Vec<WorldEntry>,
    #[serde(default)]
    pub owners: BTreeMap<OwnerId, String>,
}

/// Error type for world file loading
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read world file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl StaticDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let directory: Self = toml::from_str(&content)?;
        tracing::info!(
            worlds = directory.worlds.len(),
            owners = directory.owners.len(),
            "Loaded world file"
        );
        Ok(directory)
    }

    pub fn with_world(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        region: Option<RegionId>,
    ) -> Self {
        self.worlds.push(WorldEntry {
            key: key.into(),
            name: name.into(),
            region,
        });
        self
    }

    pub fn with_owner(mut self, owner: impl Into<OwnerId>, name: impl Into<String>) -> Self {
        self.owners.insert(owner.into(), name.into());
        self
    }
}

impl Directory for StaticDirectory {
    fn region_for_surface(&self, surface_key: &str) -> Option<RegionId> {
        self.worlds
            .iter()
            .find(|w| w.key == surface_key)
            .map(WorldEntry::region_id)
    }

    fn region_name(&self, region: &RegionId) -> Option<String> {
        self.worlds
            .iter()
            .find(|w| &w.region_id() == region)
            .map(|w| w.name.clone())
    }

    fn owner_name(&self, owner: &OwnerId) -> Option<String> {
        self.owners.get(owner).cloned()
    }
}
