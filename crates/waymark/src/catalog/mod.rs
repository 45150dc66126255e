//! Waystone Catalog
//!
//! The catalog is the upstream store of waystone records. It is owned by
//! another component and consumed here through the versioned
//! [`CatalogSource`] read interface; this crate never writes to it.

mod file;
mod fingerprint;
mod memory;

pub use file::JsonCatalog;
pub use fingerprint::Fingerprint;
pub use memory::MemoryCatalog;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::{OwnerId, Position, RecordId, RegionId};

/// Version of the catalog read interface this crate understands
pub const CATALOG_API_VERSION: u32 = 1;

/// A single waystone as published by the catalog
///
/// Field order matters: records sort by `id` first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Unique waystone identifier
    pub id: RecordId,
    /// Display name chosen by the owner
    pub name: String,
    /// Block position
    pub position: Position,
    /// World the waystone is placed in
    pub region: RegionId,
    /// Player who owns the waystone
    pub owner: OwnerId,
    /// Private waystones are locked to their owner
    #[serde(default)]
    pub locked: bool,
    /// Creation time, if the catalog recorded one
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Create a public record with no creation time
    pub fn new(
        id: impl Into<RecordId>,
        name: impl Into<String>,
        position: Position,
        region: impl Into<RegionId>,
        owner: impl Into<OwnerId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            region: region.into(),
            owner: owner.into(),
            locked: false,
            created_at: None,
        }
    }

    /// Mark the record as private
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Set the creation time
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Read interface published by the waystone catalog
pub trait CatalogSource: Send + Sync {
    /// Version of the read interface implemented by this source
    fn api_version(&self) -> u32 {
        CATALOG_API_VERSION
    }

    /// Fetch every record currently in the catalog
    fn fetch_all(&self) -> Result<Vec<Record>, CatalogError>;
}
