//! Inventory console core
//!
//! Client-side state layer of the inventory administration console: a
//! persistent key-value cache, an HTTP client for the inventory backend,
//! the request orchestrator, one state container per resource and the
//! session.

pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod console;
pub mod core;
pub mod db;
pub mod store;

// Re-export commonly used types
pub use crate::console::{Console, ConsoleEvent};
pub use crate::core::{Config, ErrorInfo, ErrorKind};
pub use auth::SessionStore;
pub use cache::{KeyValueCache, SqliteCache};
pub use store::{EntityStore, Orchestrator, ResolutionPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
