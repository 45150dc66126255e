//! Per-service view of the host, handed to every hook.

use tokio::sync::broadcast;

use super::{Event, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ServiceContext {
    pub service_id: String,
    bus: broadcast::Sender<Event>,
}

impl ServiceContext {
    pub(crate) fn new(service_id: String, bus: broadcast::Sender<Event>) -> Self {
        Self { service_id, bus }
    }

    /// Put an event on the bus. Fails when nobody is listening.
    pub fn publish(&self, event: Event) -> ServiceResult<()> {
        self.bus
            .send(event)
            .map(drop)
            .map_err(|_| ServiceError::ChannelClosed)
    }

    /// Publish an event with this service as its source
    pub fn emit(&self, event_type: impl Into<String>, data: serde_json::Value) -> ServiceResult<()> {
        self.publish(Event::new(event_type, self.service_id.as_str(), data))
    }
}
