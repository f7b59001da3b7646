//! ITDesk Domain Primitives
//!
//! - **Value Objects**: CompanyId, UserId, TicketId, ...
//! - **Domain Events**: metadata and the `DomainEvent` trait
//! - **Repositories**: shared persistence error types

pub mod events;
pub mod repositories;
pub mod value_objects;

pub use events::*;
pub use repositories::*;
pub use value_objects::*;
