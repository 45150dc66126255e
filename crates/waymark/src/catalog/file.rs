//! JSON file catalog
//!
//! Reads a catalog export written by the waystone component:
//!
//! ```json
//! { "api_version": 1, "waystones": [ { "id": "...", "name": "...", ... } ] }
//! ```
//!
//! The file is re-read on every fetch so edits are picked up by the next poll.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{CATALOG_API_VERSION, CatalogSource, Record};
use crate::error::CatalogError;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_api_version")]
    api_version: u32,
    #[serde(default)]
    waystones: Vec<Record>,
}

fn default_api_version() -> u32 {
    CATALOG_API_VERSION
}

/// Catalog backed by a JSON export file
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    api_version: u32,
}

impl JsonCatalog {
    /// Open the export and read its interface version
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let file = Self::read(&path)?;
        tracing::debug!(
            path = %path.display(),
            api_version = file.api_version,
            waystones = file.waystones.len(),
            "Opened catalog file"
        );
        Ok(Self {
            path,
            api_version: file.api_version,
        })
    }

    fn read(path: &Path) -> Result<CatalogFile, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl CatalogSource for JsonCatalog {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn fetch_all(&self) -> Result<Vec<Record>, CatalogError> {
        Ok(Self::read(&self.path)?.waystones)
    }
}
