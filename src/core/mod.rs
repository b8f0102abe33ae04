//! Core application layer
//!
//! This module provides:
//! - Configuration management
//! - Structured logging system
//! - Error handling and outcome types

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{ApiResult, ConsoleError, ErrorContext, ErrorInfo, ErrorKind, Result};
pub use logging::Logger;
