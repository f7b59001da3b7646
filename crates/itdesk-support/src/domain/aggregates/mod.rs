//! Aggregates
pub mod employee;
pub mod product;
pub mod ticket;
pub use employee::{Employee, EmployeeLink};
pub use product::{Product, ProductError};
pub use ticket::{LogAction, NewTicket, Ticket, TicketChanges, TicketComment, TicketError, TicketLog};
