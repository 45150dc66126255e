//! Waymark - Waystone Map Markers
//!
//! Mirrors a waystone catalog onto a web map as one layer of icon markers
//! per world:
//! - Change detection by polling and fingerprinting the catalog
//! - Marker projection with per-world marker sets and HTML tooltips
//! - A host service that drives refreshes from its tick timer and events
//! - An operator refresh command with a permission check

// Core data
pub mod catalog;
pub mod error;
pub mod types;

// Collaborators supplied by the host
pub mod directory;
pub mod surface;

// Projection
pub mod icons;
pub mod marker;
pub mod projector;

// Change detection and scheduling
pub mod detector;
pub mod engine;
pub mod service;

// Host-facing surface
pub mod addon;
pub mod command;
pub mod config;

#[cfg(test)]
pub(crate) mod testing;

pub use addon::{Addon, AddonError, Collaborators};
pub use catalog::{CatalogSource, Record};
pub use command::{CommandOutcome, CommandSender, ConsoleSender, RefreshCommand};
pub use config::AddonConfig;
pub use engine::SyncEngine;
pub use error::{CatalogError, SurfaceError, SyncError};
