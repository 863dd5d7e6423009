//! Domain types for the attached device, its app listing, and operations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of the attached device, captured once when a session opens.
///
/// Immutable after capture; the session manager owns the master copy and
/// publishes read-only clones to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    /// Unique device identifier
    pub udid: String,

    /// Human-readable device name
    pub name: String,

    /// Hardware model identifier (e.g., "iPhone14,2")
    pub product_type: String,

    /// OS version string (e.g., "17.4.1")
    pub product_version: String,
}

impl DeviceIdentity {
    /// One-line summary suitable for a title bar:
    /// `iPhone, iPhone14,2, iOS 17.4.1`
    pub fn summary(&self) -> String {
        format!(
            "{}, {}, iOS {}",
            self.name, self.product_type, self.product_version
        )
    }
}

/// One installed application, as reported by the installer listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    /// Unique key within a listing
    pub bundle_id: String,

    /// Free-form version string
    pub version: String,

    /// Name shown on the device home screen
    pub display_name: String,
}

/// The three installer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    List,
    Install,
    Uninstall,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Install => "install",
            OperationKind::Uninstall => "uninstall",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single requested operation against the current device session.
///
/// Ephemeral: exists only for the duration of one coordinator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    /// Refresh the app listing
    List,

    /// Install the package at `path` (used verbatim; sanitization is the
    /// caller's concern)
    Install { path: PathBuf },

    /// Remove the app with the given bundle identifier
    Uninstall { bundle_id: String },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::List => OperationKind::List,
            OperationRequest::Install { .. } => OperationKind::Install,
            OperationRequest::Uninstall { .. } => OperationKind::Uninstall,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, OperationRequest::List)
    }
}

/// Snapshot of the poller's view of device availability.
///
/// Single process-wide instance, mutated only by the presence poller on each
/// tick and read by the operation coordinator to gate requests. `udid` holds
/// the empty string while no session is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Whether a device session is currently open
    pub has_session: bool,

    /// Last-known device identifier (empty = none)
    pub udid: String,

    /// Session generation counter; increments on every successful open.
    /// Lets readers detect that the session an operation started under has
    /// since been torn down, even if the same device reappeared.
    pub epoch: u64,
}

impl PollState {
    /// State after a successful session open
    pub fn connected(udid: impl Into<String>, epoch: u64) -> Self {
        Self {
            has_session: true,
            udid: udid.into(),
            epoch,
        }
    }

    /// State after a close (or before any device was seen)
    pub fn disconnected(epoch: u64) -> Self {
        Self {
            has_session: false,
            udid: String::new(),
            epoch,
        }
    }
}
