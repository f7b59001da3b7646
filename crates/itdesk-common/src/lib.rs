//! ITDesk Common - Shared types for the ticketing and asset core
//!
//! This crate provides the primitives every other crate builds on:
//! - Strongly typed identifiers (company, user, ticket, ...)
//! - The clock collaborator used for all deadline math
//! - Domain event metadata
//! - Repository error types
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          itdesk-api                              │
//! │        HTTP | bearer auth | error mapping | SLA scheduler        │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                        itdesk-support                            │
//! │  Ticket service → Access policy → SLA evaluator → Dispatcher     │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                        itdesk-tenant                             │
//! │      Companies | Users | Tenant scope filter | Plan limits       │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                        itdesk-common                             │
//! │         Identifiers | Clock | Events | Repository errors         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod domain;
pub mod error;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use domain::*;
pub use error::*;
