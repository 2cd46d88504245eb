//! Domain types independent of HTTP and SQL
pub mod events;
pub mod value_objects;
pub mod variant_match;

pub use events::{DomainEvent, EventPublisher};
pub use value_objects::{ClearanceLevel, PromotionStatus, Role, VariantType};
