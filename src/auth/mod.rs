//! Authentication
//!
//! Session lifecycle against the backend:
//! - Login and token storage
//! - Loading the signed-in user
//! - Profile updates and remote logout

pub mod session;

pub use session::{SessionState, SessionStore};
