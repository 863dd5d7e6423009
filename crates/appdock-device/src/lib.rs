//! # appdock-device - Device Session Management
//!
//! The native-library boundary, the single device session, and the presence
//! poller that drives session open/close transitions.
//!
//! Depends on [`appdock_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Native Boundary (`bridge`)
//! - [`DeviceBridge`] - Trait the real bindings implement
//! - [`BridgeError`] - Native error signals
//! - [`DeviceHandle`], [`SessionHandle`] - Opaque handle tokens
//! - [`NullBridge`] - No-bindings stand-in reporting no devices
//!
//! ### Session Lifecycle (`session`)
//! - [`SessionManager`] - open/close/current_identity with guaranteed
//!   handle release
//!
//! ### Presence Polling (`poller`)
//! - [`PresencePoller`] - Fixed-cadence tick loop, edge-triggered
//!   connect/disconnect, `PollState` publisher

pub mod bridge;
pub mod poller;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use bridge::{BridgeError, DeviceBridge, DeviceHandle, NullBridge, SessionHandle};
pub use poller::{PresencePoller, DEFAULT_POLL_INTERVAL};
pub use session::SessionManager;
