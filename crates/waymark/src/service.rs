//! Sync Service
//!
//! Host service that drives the sync engine: the host's tick timer runs the
//! change detector, and events trigger a forced refresh or a reattach after
//! the map renderer reloads.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use waymark_host::service::{Event, Service, ServiceContext, ServiceError, ServiceResult, ServiceSpec};

use crate::detector::TickOutcome;
use crate::engine::SyncEngine;
use crate::error::SyncResult;
use crate::projector::RefreshReport;
use crate::types::RegionId;

/// Service id of the waystone sync service
pub const SYNC_SERVICE_ID: &str = "waymark/sync";

/// Ask the service to refresh every world now
pub const REFRESH_EVENT: &str = "waymark/refresh";

/// Published after every full refresh with the report as payload
pub const REFRESHED_EVENT: &str = "waymark/refreshed";

/// The map renderer reloaded and dropped its layers
pub const SURFACE_RELOADED_EVENT: &str = "surface/reloaded";

/// Wait after a renderer reload before registering layers again
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_secs(1);

/// Runs refresh cycles on the host's timer and on request
pub struct SyncService {
    engine: SyncEngine,
    interval: Option<Duration>,
    reload_delay: Duration,
    pending_reattach: Option<JoinHandle<()>>,
}

impl SyncService {
    /// `interval` of `None` disables timed refreshes; events still work
    pub fn new(engine: SyncEngine, interval: Option<Duration>) -> Self {
        Self {
            engine,
            interval,
            reload_delay: DEFAULT_RELOAD_DELAY,
            pending_reattach: None,
        }
    }

    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Run a blocking engine call off the async worker
    async fn run<T, F>(&self, call: F) -> Result<SyncResult<T>, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(SyncEngine) -> SyncResult<T> + Send + 'static,
    {
        run_blocking(self.engine.clone(), call).await
    }

    /// Reattach once the reload delay has passed.
    ///
    /// Runs beside the service loop so ticks and commands are not held up.
    /// A reload arriving while one is pending restarts the delay.
    fn schedule_reattach(&mut self, ctx: &ServiceContext) {
        if let Some(pending) = self.pending_reattach.take() {
            pending.abort();
        }

        let engine = self.engine.clone();
        let delay = self.reload_delay;
        let ctx = ctx.clone();
        self.pending_reattach = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match run_blocking(engine, |engine| engine.reattach()).await {
                Ok(Ok(report)) => {
                    tracing::info!(
                        worlds = report.refreshed,
                        "Re-registered waystone layers after map reload"
                    );
                    announce(&ctx, &report);
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "Failed to re-register waystone layers"),
                Err(e) => tracing::error!(error = %e, "Reattach task failed"),
            }
        }));
    }
}

async fn run_blocking<T, F>(engine: SyncEngine, call: F) -> Result<SyncResult<T>, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(SyncEngine) -> SyncResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(engine))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

#[async_trait]
impl Service for SyncService {
    fn spec(&self) -> ServiceSpec {
        let spec = ServiceSpec::new(SYNC_SERVICE_ID, "Waystone Sync")
            .subscribe(REFRESH_EVENT)
            .subscribe(SURFACE_RELOADED_EVENT)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_description("Keeps waystone markers in step with the catalog");

        match self.interval {
            Some(interval) => spec.with_tick_interval(interval),
            None => spec,
        }
    }

    async fn on_start(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        match self.interval {
            Some(interval) => tracing::info!(
                service_id = %ctx.service_id,
                "Periodic waystone refresh enabled (every {}s)",
                interval.as_secs()
            ),
            None => tracing::info!(
                service_id = %ctx.service_id,
                "Auto-refresh disabled. Use /waystones-reload-map to manually refresh markers."
            ),
        }
        Ok(())
    }

    async fn on_stop(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        if let Some(pending) = self.pending_reattach.take() {
            pending.abort();
        }
        tracing::debug!(service_id = %ctx.service_id, "Waystone sync stopped");
        Ok(())
    }

    async fn on_event(&mut self, ctx: &ServiceContext, event: Event) -> ServiceResult<()> {
        match event.event_type.as_str() {
            REFRESH_EVENT => match event.get_str("region").map(RegionId::from) {
                Some(region) => {
                    let placed = self
                        .run(move |engine| engine.refresh_region(&region))
                        .await?
                        .map_err(|e| ServiceError::EventError(e.to_string()))?;
                    tracing::debug!(source = %event.source, markers = placed, "World refresh finished");
                }
                None => {
                    let report = self
                        .run(|engine| engine.force_refresh())
                        .await?
                        .map_err(|e| ServiceError::EventError(e.to_string()))?;
                    announce(ctx, &report);
                }
            },
            SURFACE_RELOADED_EVENT => self.schedule_reattach(ctx),
            _ => {}
        }
        Ok(())
    }

    async fn on_tick(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        let outcome = self
            .run(|engine| engine.tick())
            .await?
            .map_err(|e| ServiceError::TickError(e.to_string()))?;

        if let TickOutcome::Refreshed(report) = outcome {
            if !report.is_complete() {
                tracing::warn!(failed = report.failed, "Some worlds were not refreshed");
            }
            announce(ctx, &report);
        }
        Ok(())
    }
}

/// Publish a [`REFRESHED_EVENT`] describing a finished refresh
fn announce(ctx: &ServiceContext, report: &RefreshReport) {
    let data = serde_json::json!({
        "worlds": report.refreshed,
        "failed": report.failed,
        "markers": report.markers,
    });
    if let Err(e) = ctx.emit(REFRESHED_EVENT, data) {
        tracing::debug!(error = %e, "Refresh not announced");
    }
}
