//! Service Manager
//!
//! Owns every hosted service: spawns its task, keeps its handle, carries the
//! event bus, and stops services one by one or all together.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::context::ServiceContext;
use super::handle::StateCell;
use super::task::ServiceTask;
use super::{Event, Service, ServiceError, ServiceHandle, ServiceResult};

const EVENT_BUS_CAPACITY: usize = 256;
const COMMAND_QUEUE: usize = 64;
const SHUTDOWN_ALL_TIMEOUT: Duration = Duration::from_secs(30);

struct Hosted {
    handle: ServiceHandle,
    task: JoinHandle<ServiceResult<()>>,
    shutdown_timeout: Duration,
}

/// Registry and event bus for hosted services
pub struct ServiceManager {
    services: DashMap<String, Hosted>,
    bus: broadcast::Sender<Event>,
    shutdown_signal: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            bus: broadcast::channel(EVENT_BUS_CAPACITY).0,
            shutdown_signal: broadcast::channel(1).0,
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a service on its own task.
    ///
    /// Returns as soon as the task is spawned; `on_start` may still be
    /// running. Events published after this returns reach the service.
    pub async fn spawn<S: Service>(&self, service: S) -> ServiceResult<ServiceHandle> {
        let spec = service.spec();
        let id = spec.id.clone();

        let entry = match self.services.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(ServiceError::AlreadyRunning(id)),
            dashmap::mapref::entry::Entry::Vacant(entry) => entry,
        };

        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let state = StateCell::new();
        let handle = ServiceHandle::new(id.clone(), command_tx, state.clone());
        let shutdown_timeout = spec.shutdown_timeout;

        let task = ServiceTask {
            service,
            ctx: ServiceContext::new(id, self.bus.clone()),
            spec,
            state,
            commands,
            events: self.bus.subscribe(),
            shutdown: self.shutdown_signal.subscribe(),
        };

        entry.insert(Hosted {
            handle: handle.clone(),
            task: tokio::spawn(task.run()),
            shutdown_timeout,
        });
        Ok(handle)
    }

    pub fn get(&self, service_id: &str) -> Option<ServiceHandle> {
        self.services.get(service_id).map(|hosted| hosted.handle.clone())
    }

    pub fn is_running(&self, service_id: &str) -> bool {
        self.get(service_id).is_some_and(|handle| handle.is_running())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Stop one service and wait for its task, `on_stop` included
    pub async fn stop(&self, service_id: &str) -> ServiceResult<()> {
        let (_, hosted) = self
            .services
            .remove(service_id)
            .ok_or_else(|| ServiceError::NotRunning(service_id.to_string()))?;

        // Already gone is fine; the join below reports how it ended
        let _ = hosted.handle.shutdown().await;

        let grace = hosted.shutdown_timeout + Duration::from_secs(1);
        match tokio::time::timeout(grace, hosted.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(service_id, error = %e, "Service task panicked");
                Err(ServiceError::Internal(format!("service task panicked: {}", e)))
            }
            Err(_) => {
                tracing::warn!(service_id, "Service shutdown timed out");
                Err(ServiceError::ShutdownTimeout)
            }
        }
    }

    /// Signal every service to stop and wait until all have finished
    pub async fn shutdown_all(&self) -> ServiceResult<()> {
        tracing::info!(count = self.len(), "Shutting down all services");
        let _ = self.shutdown_signal.send(());

        let wait = async {
            while !self.services.is_empty() {
                self.services.retain(|_, hosted| !hosted.task.is_finished());
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };

        tokio::time::timeout(SHUTDOWN_ALL_TIMEOUT, wait).await.map_err(|_| {
            tracing::warn!(remaining = self.len(), "Some services did not stop within timeout");
            ServiceError::ShutdownTimeout
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Bus
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish to every subscribed service. Nobody listening is not an error.
    pub fn publish_event(&self, event: Event) {
        let _ = self.bus.send(event);
    }

    pub fn emit(&self, event_type: impl Into<String>, source: impl Into<String>, data: serde_json::Value) {
        self.publish_event(Event::new(event_type, source, data));
    }

    /// Every event published from now on, whatever its type
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}
