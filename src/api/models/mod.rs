//! Wire models
//!
//! Records mirror the server's JSON. Every record keeps unknown fields in a
//! flattened `extra` map so that re-serializing a record gives back what the
//! server sent.

pub mod auth;
pub mod common;
pub mod companies;
pub mod products;
pub mod providers;
pub mod roles;
pub mod stock;
pub mod users;

pub use auth::*;
pub use common::*;
pub use companies::*;
pub use products::*;
pub use providers::*;
pub use roles::*;
pub use stock::*;
pub use users::*;
