//! Manual refresh command for operators.

use crate::engine::SyncEngine;

/// Permission required to run [`RefreshCommand`]
pub const RELOAD_PERMISSION: &str = "waystonewarps.map.reload";

const MSG_REFRESHING: &str = "Refreshing waystone markers on the map...";
const MSG_REFRESHED: &str = "Waystone markers refreshed successfully!";
const MSG_FAILED: &str = "Waystone markers could not be refreshed. See the server log for details.";
const MSG_NO_PERMISSION: &str = "You don't have permission to use this command.";

/// Whoever issued a command
pub trait CommandSender {
    fn has_permission(&self, permission: &str) -> bool;

    fn send_message(&self, message: &str);
}

/// Result of a manual refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The sender was allowed and a refresh cycle ran
    Refreshed,
    /// The sender lacks [`RELOAD_PERMISSION`]
    Unauthorized,
}

/// The server console. Holds every permission and writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        tracing::info!(target: "waymark::console", "{}", message);
    }
}

/// `/waystones-reload-map`: redraw every world now, skipping change detection
#[derive(Clone)]
pub struct RefreshCommand {
    engine: SyncEngine,
}

impl RefreshCommand {
    pub const NAME: &'static str = "waystones-reload-map";

    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// Check the sender's permission and run a forced refresh.
    ///
    /// Refresh errors are logged and reported to the sender; the outcome is
    /// still [`CommandOutcome::Refreshed`] since the sender was authorised.
    pub fn execute(&self, sender: &dyn CommandSender) -> CommandOutcome {
        if !sender.has_permission(RELOAD_PERMISSION) {
            sender.send_message(MSG_NO_PERMISSION);
            return CommandOutcome::Unauthorized;
        }

        sender.send_message(MSG_REFRESHING);
        match self.engine.force_refresh() {
            Ok(report) => {
                tracing::debug!(?report, "Manual refresh finished");
                sender.send_message(MSG_REFRESHED);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Manual refresh failed");
                sender.send_message(MSG_FAILED);
            }
        }
        CommandOutcome::Refreshed
    }
}
