//! Client-side state containers
//!
//! One [`EntityStore`] per backend resource, all driven through the shared
//! [`Orchestrator`].

pub mod entity;
pub mod feedback;
pub mod normalize;
pub mod orchestrator;
pub mod projection;
pub mod resources;
pub mod state;

pub use entity::{Capabilities, CollectionSync, EntityStore, Operation, Resettable, Resource};
pub use feedback::{Feedback, Severity};
pub use orchestrator::{Orchestrator, ResolutionPolicy};
pub use projection::{ComboOption, ComboSource};
pub use resources::*;
pub use state::{EntityState, Tracked};
