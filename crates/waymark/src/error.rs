//! Error types for catalog access, surface calls and refresh cycles.

use crate::types::{RegionId, SurfaceHandle};

/// Errors raised by a catalog source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by a marker surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Unknown surface region: {0}")]
    UnknownHandle(SurfaceHandle),

    #[error("No waystone layer registered for region: {0}")]
    NoLayer(SurfaceHandle),

    #[error("Surface rejected the request: {0}")]
    Rejected(String),

    #[error("Surface I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode surface data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while running a refresh cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Catalog fetch failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Surface call failed for region {region}: {source}")]
    Surface {
        region: RegionId,
        #[source]
        source: SurfaceError,
    },

    #[error("Failed to list surface regions: {0}")]
    ListRegions(#[source] SurfaceError),

    #[error("Region not bound: {0}")]
    UnboundRegion(RegionId),

    #[error("Sync engine has been shut down")]
    ShutDown,
}

impl SyncError {
    pub(crate) fn surface(region: &RegionId, source: SurfaceError) -> Self {
        Self::Surface {
            region: region.clone(),
            source,
        }
    }
}

/// Result type for refresh operations
pub type SyncResult<T> = Result<T, SyncError>;
