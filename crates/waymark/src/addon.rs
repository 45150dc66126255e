//! Addon Bootstrap
//!
//! Wires the catalog, the marker surface and the directory into a sync
//! engine, starts the sync service on a host service manager, and tears it
//! all down again in the right order.

use std::sync::Arc;

use waymark_host::service::{Event, ServiceError, ServiceManager};

use crate::catalog::{CATALOG_API_VERSION, CatalogSource};
use crate::command::RefreshCommand;
use crate::config::{AddonConfig, ConfigError};
use crate::directory::Directory;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::icons::IconSet;
use crate::marker::MarkerFactory;
use crate::projector::MarkerProjector;
use crate::service::{SURFACE_RELOADED_EVENT, SYNC_SERVICE_ID, SyncService};
use crate::surface::MarkerSurface;

/// Errors that stop the addon from activating
#[derive(Debug, thiserror::Error)]
pub enum AddonError {
    #[error("Required collaborator not available: {0}")]
    MissingCollaborator(&'static str),

    #[error("Cannot access waystone catalog: {0}")]
    UpstreamAccess(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Initial sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Service host error: {0}")]
    Host(#[from] ServiceError),
}

/// What the host hands the addon. Absent upstream components are `None`.
pub struct Collaborators {
    pub catalog: Option<Arc<dyn CatalogSource>>,
    pub surface: Option<Arc<dyn MarkerSurface>>,
    pub directory: Arc<dyn Directory>,
}

/// A running addon
pub struct Addon {
    engine: SyncEngine,
    services: Arc<ServiceManager>,
}

impl Addon {
    /// Verify the collaborators and configuration and build the sync
    /// engine, without drawing anything yet
    pub fn prepare(collaborators: Collaborators, config: &AddonConfig) -> Result<SyncEngine, AddonError> {
        let catalog = collaborators.catalog.ok_or_else(|| {
            tracing::error!("Waystone catalog not found! This addon requires the waystone plugin.");
            AddonError::MissingCollaborator("waystone catalog")
        })?;
        let surface = collaborators.surface.ok_or_else(|| {
            tracing::error!("Map renderer not found! This addon requires a marker surface.");
            AddonError::MissingCollaborator("marker surface")
        })?;

        let version = catalog.api_version();
        if version != CATALOG_API_VERSION {
            tracing::error!(
                found = version,
                expected = CATALOG_API_VERSION,
                "Failed to access the waystone catalog. Is the waystone plugin version compatible?"
            );
            return Err(AddonError::UpstreamAccess(format!(
                "catalog interface version {} (expected {})",
                version, CATALOG_API_VERSION
            )));
        }

        config.validate()?;

        let projector = MarkerProjector::new(catalog, surface, collaborators.directory)
            .with_factory(MarkerFactory::new(config.display.icon_size))
            .with_icons(IconSet::new(&config.icons.dir))
            .with_show_locked(config.display.show_locked);
        Ok(SyncEngine::new(projector))
    }

    /// Activate the addon: verify collaborators, draw the initial markers
    /// and start the sync service on `services`.
    pub async fn initialize(
        collaborators: Collaborators,
        config: AddonConfig,
        services: Arc<ServiceManager>,
    ) -> Result<Self, AddonError> {
        let engine = Self::prepare(collaborators, &config)?;

        let initial = engine.clone();
        let report = tokio::task::spawn_blocking(move || initial.initialize())
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        tracing::info!(
            worlds = report.refreshed,
            markers = report.markers,
            "Waystone markers drawn"
        );

        let service = SyncService::new(engine.clone(), config.refresh_interval());
        if let Err(e) = services.spawn(service).await {
            engine.shutdown();
            return Err(e.into());
        }

        tracing::info!("Waystone map addon enabled");
        Ok(Self { engine, services })
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Operator command bound to this addon's engine
    pub fn refresh_command(&self) -> RefreshCommand {
        RefreshCommand::new(self.engine.clone())
    }

    /// Tell the addon that the map renderer reloaded and dropped its layers
    pub fn surface_reloaded(&self) {
        self.services
            .publish_event(Event::now(SURFACE_RELOADED_EVENT, "host"));
    }

    /// Stop the timer first, then remove every layer
    pub async fn shutdown(self) {
        if let Err(e) = self.services.stop(SYNC_SERVICE_ID).await {
            tracing::warn!(error = %e, "Sync service did not stop cleanly");
        }

        let engine = self.engine.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || engine.shutdown()).await {
            tracing::error!(error = %e, "Failed to unregister waystone layers");
        }
        tracing::info!("Waystone map addon disabled");
    }
}
