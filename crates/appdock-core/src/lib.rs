//! # appdock-core - Core Domain Types
//!
//! Foundation crate for appdock. Provides domain types, error handling,
//! event definitions, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DeviceIdentity`] - Identity fields captured when a session opens
//! - [`AppRecord`] - One installed application from the listing
//! - [`OperationKind`], [`OperationRequest`] - The three installer operations
//! - [`PollState`] - The poller's published availability snapshot
//!
//! ### Events (`events`)
//! - [`AppEvent`] - Everything the core tells the presentation layer
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use appdock_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all appdock crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::AppEvent;
pub use types::{AppRecord, DeviceIdentity, OperationKind, OperationRequest, PollState};
