//! Waymark Host - service runtime for long-running addon components
//!
//! This crate owns the lifecycle of services: spawning them onto tokio tasks,
//! driving their periodic ticks, routing events to them and shutting them
//! down in order.

pub mod service;
