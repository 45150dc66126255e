//! Service Handle
//!
//! Cheap, cloneable access to a running service: its state and the two
//! commands it accepts.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, oneshot};

use super::{ServiceError, ServiceResult};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Where a service is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    Starting = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
    /// `on_start` or `on_stop` failed, or `on_stop` timed out
    Failed = 4,
}

impl ServiceState {
    const ALL: [ServiceState; 5] = [
        ServiceState::Starting,
        ServiceState::Running,
        ServiceState::Stopping,
        ServiceState::Stopped,
        ServiceState::Failed,
    ];

    pub fn is_running(self) -> bool {
        self == ServiceState::Running
    }

    /// Stopped or failed; the task has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Stopped | ServiceState::Failed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
            ServiceState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State shared between a service task and its handles
#[derive(Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ServiceState::Starting as u8)))
    }

    pub(crate) fn get(&self) -> ServiceState {
        let raw = self.0.load(Ordering::Acquire);
        ServiceState::ALL
            .get(usize::from(raw))
            .copied()
            .unwrap_or(ServiceState::Failed)
    }

    pub(crate) fn set(&self, state: ServiceState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) enum ServiceCommand {
    /// Run `on_tick` now and report its result
    ForceTick(oneshot::Sender<ServiceResult<()>>),
    Shutdown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ServiceHandle {
    pub service_id: String,
    commands: mpsc::Sender<ServiceCommand>,
    state: StateCell,
}

impl ServiceHandle {
    pub(crate) fn new(service_id: String, commands: mpsc::Sender<ServiceCommand>, state: StateCell) -> Self {
        Self {
            service_id,
            commands,
            state,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Run the service's tick out of schedule and wait for it.
    ///
    /// Queued behind whatever the service is doing, so it never overlaps
    /// another hook.
    pub async fn force_tick(&self) -> ServiceResult<()> {
        let (reply, result) = oneshot::channel();
        self.send(ServiceCommand::ForceTick(reply)).await?;
        result.await.map_err(|_| ServiceError::ChannelClosed)?
    }

    /// Ask the service to leave its loop. Does not wait for `on_stop`.
    pub async fn shutdown(&self) -> ServiceResult<()> {
        self.send(ServiceCommand::Shutdown).await
    }

    async fn send(&self, command: ServiceCommand) -> ServiceResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::NotRunning(self.service_id.clone()))
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("service_id", &self.service_id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_round_trips_every_state() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), ServiceState::Starting);

        for state in ServiceState::ALL {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }

        cell.0.store(42, Ordering::Release);
        assert_eq!(cell.get(), ServiceState::Failed);
    }

    #[test]
    fn test_state_flags() {
        assert!(ServiceState::Running.is_running());
        assert!(!ServiceState::Stopping.is_running());
        assert!(ServiceState::Stopped.is_terminal());
        assert!(ServiceState::Failed.is_terminal());
        assert!(!ServiceState::Starting.is_terminal());
        assert_eq!(ServiceState::Stopping.to_string(), "stopping");
    }

    #[tokio::test]
    async fn test_commands_fail_once_the_service_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = ServiceHandle::new("gone".into(), tx, StateCell::new());

        assert!(matches!(handle.shutdown().await, Err(ServiceError::NotRunning(_))));
        assert!(matches!(handle.force_tick().await, Err(ServiceError::NotRunning(_))));
    }
}
