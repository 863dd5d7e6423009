//! appdock-app - Operation coordination and engine wiring for appdock
//!
//! This crate owns everything above the device and installer layers: settings
//! loading, the operation coordinator that serializes installer invocations,
//! the presentation-facing state snapshot, and the engine that wires the
//! poller and coordinator together.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod state;

// Re-export primary types
pub use config::Settings;
pub use coordinator::OperationCoordinator;
pub use engine::Engine;
pub use state::AppState;

// Re-export device types front ends need for engine construction
pub use appdock_device::{DeviceBridge, NullBridge};
