//! Support Domain Layer
//!
//! - **Aggregates**: Ticket, Employee, Product
//! - **Value Objects**: Priority, TicketStatus, SLA deadlines and flags
//! - **Domain Events**: SupportEvent

pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::SupportEvent;
pub use value_objects::*;
