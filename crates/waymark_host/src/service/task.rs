//! Service Task
//!
//! The loop that runs inside each service's tokio task: start, then react to
//! commands, events, the global shutdown signal and the tick timer until told
//! to stop, then stop.

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::handle::{ServiceCommand, StateCell};
use super::{Event, Service, ServiceContext, ServiceError, ServiceResult, ServiceSpec, ServiceState};

pub(crate) struct ServiceTask<S: Service> {
    pub service: S,
    pub ctx: ServiceContext,
    pub spec: ServiceSpec,
    pub state: StateCell,
    pub commands: mpsc::Receiver<ServiceCommand>,
    pub events: broadcast::Receiver<Event>,
    pub shutdown: broadcast::Receiver<()>,
}

/// Why the loop ended
#[derive(Debug)]
enum Exit {
    Command,
    Signal,
    HandlesDropped,
}

impl<S: Service> ServiceTask<S> {
    pub async fn run(mut self) -> ServiceResult<()> {
        let id = self.ctx.service_id.clone();

        if let Err(e) = self.service.on_start(&self.ctx).await {
            tracing::error!(service_id = %id, error = %e, "Service failed to start");
            self.state.set(ServiceState::Failed);
            return Err(e);
        }
        self.state.set(ServiceState::Running);
        tracing::info!(service_id = %id, "Service started");

        let exit = self.serve().await;
        tracing::debug!(service_id = %id, reason = ?exit, "Service leaving its loop");

        self.stop().await
    }

    async fn serve(&mut self) -> Exit {
        let mut timer = self.spec.tick_interval.map(timer);

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => return Exit::Signal,

                command = self.commands.recv() => match command {
                    None => return Exit::HandlesDropped,
                    Some(ServiceCommand::Shutdown) => return Exit::Command,
                    Some(ServiceCommand::ForceTick(reply)) => {
                        let result = self.tick("Error during forced tick").await;
                        let _ = reply.send(result);
                    }
                },

                received = self.events.recv() => match received {
                    Ok(event) => self.deliver(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(service_id = %self.ctx.service_id, missed, "Service fell behind on events");
                    }
                    // The manager owns the sender; it only closes on drop
                    Err(broadcast::error::RecvError::Closed) => return Exit::Signal,
                },

                _ = next_tick(&mut timer) => {
                    let _ = self.tick("Error during tick").await;
                }
            }
        }
    }

    async fn deliver(&mut self, event: Event) {
        if !self.spec.wants(&event.event_type) {
            return;
        }
        let event_type = event.event_type.clone();
        if let Err(e) = self.service.on_event(&self.ctx, event).await {
            tracing::warn!(
                service_id = %self.ctx.service_id,
                event_type = %event_type,
                error = %e,
                "Error handling event"
            );
        }
    }

    async fn tick(&mut self, failure: &str) -> ServiceResult<()> {
        let result = self.service.on_tick(&self.ctx).await;
        if let Err(e) = &result {
            tracing::warn!(service_id = %self.ctx.service_id, error = %e, "{}", failure);
        }
        result
    }

    async fn stop(mut self) -> ServiceResult<()> {
        let id = self.ctx.service_id.clone();
        self.state.set(ServiceState::Stopping);

        let outcome = tokio::time::timeout(self.spec.shutdown_timeout, self.service.on_stop(&self.ctx))
            .await
            .unwrap_or(Err(ServiceError::ShutdownTimeout));

        match outcome {
            Ok(()) => {
                self.state.set(ServiceState::Stopped);
                tracing::info!(service_id = %id, "Service stopped");
                Ok(())
            }
            Err(e) => {
                self.state.set(ServiceState::Failed);
                tracing::error!(service_id = %id, error = %e, "Service stop failed");
                Err(e)
            }
        }
    }
}

/// First tick one full period after start; late ticks are dropped
fn timer(period: std::time::Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
