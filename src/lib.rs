//! Content Control migration helper library.
//!
//! Captures, saves, reloads and purges the persisted configuration of the
//! two incompatible Content Control plugin generations, and switches which
//! one is active. The `ccm` binary is a thin CLI over this library.
//!
//! # Modules
//!
//! - `registry`: which host keys each schema version owns
//! - `store`: host store traits plus SQLite and in-memory backends
//! - `snapshot`: snapshot format, capture/apply and atomic file writes
//! - `controller`: export, save, load, delete, reset and marker workflows
//! - `actions`: named actions, origin tokens and the dispatcher
//! - `upload`: validation of uploaded snapshot files
//! - `config`: configuration file handling
//! - `output`: output mode abstraction (robot/human)
//! - `error`: error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod actions;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod output;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod upload;
