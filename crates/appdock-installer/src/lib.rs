//! # appdock-installer - Installer Subprocess Management
//!
//! Launches the external installer executable, streams its line-oriented
//! output, and parses the CSV app listing.
//!
//! Depends on [`appdock_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Management (`process`)
//! - [`InstallerProcess`] - Spawn one installer invocation
//! - [`RunningOperation`] - Line stream + terminal exit event for one run
//! - [`InstallerEvent`] - `Line` / `Exited` events
//!
//! ### Command Building (`commands`)
//! - [`build_invocation()`] - `OperationRequest` to installer argv
//! - [`InstallerInvocation`] - argv + stderr-capture flag
//!
//! ### Listing Parsing (`listing`)
//! - [`ListingParser`] - Line-by-line CSV parser for one refresh
//! - [`ParseStats`] - parsed/dropped counters per refresh

pub mod commands;
pub mod listing;
pub mod process;

pub use commands::{build_invocation, InstallerInvocation};
pub use listing::{ListingParser, ParseStats};
pub use process::{InstallerEvent, InstallerProcess, RunningOperation};
