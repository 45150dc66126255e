//! Hosted Services
//!
//! A service is a long-running component owned by the [`ServiceManager`].
//! The manager gives every service its own tokio task, so the hooks of one
//! service never overlap.
//!
//! # Hooks
//!
//! - `on_start`: once, before anything else; an error aborts the service
//! - `on_tick`: on the [`ServiceSpec`] timer, and on demand via [`ServiceHandle::force_tick`]
//! - `on_event`: for each published [`Event`] matching a subscription
//! - `on_stop`: once, bounded by `ServiceSpec::shutdown_timeout`

mod context;
mod event;
mod handle;
mod manager;
mod spec;
mod task;

pub use context::ServiceContext;
pub use event::Event;
pub use handle::{ServiceHandle, ServiceState};
pub use manager::ServiceManager;
pub use spec::ServiceSpec;

use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures reported by services and by the manager
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Service already running: {0}")]
    AlreadyRunning(String),

    #[error("Service not running: {0}")]
    NotRunning(String),

    #[error("Event handling failed: {0}")]
    EventError(String),

    #[error("Tick failed: {0}")]
    TickError(String),

    #[error("Shutdown timeout")]
    ShutdownTimeout,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A component the [`ServiceManager`] can host
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Identity, timer and subscriptions. Read once at spawn.
    fn spec(&self) -> ServiceSpec;

    async fn on_start(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        Ok(())
    }

    /// Runs even when the loop ended because every handle was dropped
    async fn on_stop(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        Ok(())
    }

    async fn on_event(&mut self, _ctx: &ServiceContext, _event: Event) -> ServiceResult<()> {
        Ok(())
    }

    async fn on_tick(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        Ok(())
    }
}
