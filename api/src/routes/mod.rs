//! API Routes

pub mod health;
pub mod products;
pub mod tickets;
