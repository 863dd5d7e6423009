//! Presentation-facing state snapshot
//!
//! The core publishes events; a front end replays them into an [`AppState`]
//! to have something to render. The core itself never reads this struct, so
//! front ends are free to keep it on whatever thread they like.

use appdock_core::events::AppEvent;
use appdock_core::types::{AppRecord, DeviceIdentity};

/// Snapshot of the core's observable state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Whether a device session is open
    pub available: bool,

    /// Identity of the connected device
    pub identity: Option<DeviceIdentity>,

    /// Current app listing, in installer order
    pub apps: Vec<AppRecord>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the snapshot.
    pub fn apply_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::DeviceConnected { identity } => {
                self.available = true;
                self.identity = Some(identity.clone());
            }
            AppEvent::DeviceDisconnected => {
                self.available = false;
                self.identity = None;
                self.apps.clear();
            }
            AppEvent::ConnectionFailed { .. } => {
                self.available = false;
                self.identity = None;
            }
            AppEvent::ListingUpdated { apps } => {
                self.apps = apps.clone();
            }
            AppEvent::LogLine { .. } | AppEvent::OperationCompleted { .. } => {}
        }
    }

    /// Title-bar text: `AppDock (<name>, <model>, iOS <version>)` while
    /// connected, `AppDock (No device)` otherwise.
    pub fn title(&self) -> String {
        match &self.identity {
            Some(identity) => format!("AppDock ({})", identity.summary()),
            None => "AppDock (No device)".to_string(),
        }
    }
}
