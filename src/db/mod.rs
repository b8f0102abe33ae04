//! Database module
//!
//! SQLite storage behind the persistent cache:
//! - Connection pool management
//! - Schema migrations

pub mod manager;
pub mod migrations;

pub use manager::DatabaseManager;
