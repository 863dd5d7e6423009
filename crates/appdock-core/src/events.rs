//! Events published by the core to the presentation layer
//!
//! The core never calls into a UI. Every observable change is delivered as an
//! [`AppEvent`] over a channel; subscribers marshal to their own thread and
//! render however they like. Events serialize with an `"event"` tag so a
//! headless front end can emit them as NDJSON directly.

use serde::{Deserialize, Serialize};

use crate::types::{AppRecord, DeviceIdentity, OperationKind};

/// Events consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// A device session opened and its identity was captured
    DeviceConnected { identity: DeviceIdentity },

    /// The open session was torn down (device unplugged or vanished)
    DeviceDisconnected,

    /// Session establishment failed; no session is open
    ConnectionFailed { reason: String },

    /// The app listing was replaced wholesale by a successful List
    ListingUpdated { apps: Vec<AppRecord> },

    /// One line of installer output (or a core status line) for the log view
    LogLine { line: String },

    /// An installer operation ran to completion.
    /// `exit_code` is `None` when the process was terminated by a signal.
    OperationCompleted {
        kind: OperationKind,
        exit_code: Option<i32>,
    },
}

impl AppEvent {
    /// Convenience constructor for log lines
    pub fn log(line: impl Into<String>) -> Self {
        AppEvent::LogLine { line: line.into() }
    }
}
