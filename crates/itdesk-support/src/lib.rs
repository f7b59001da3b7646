//! ITDesk Support - tickets, SLA tracking and authorization
//!
//! ## Data flow of a mutation
//!
//! ```text
//! request ──▶ Tenant Scope ──▶ Company writable? ──▶ Access Policy ──▶ Ticket aggregate
//!             (not found)      (business rule)       (forbidden)          │
//!                                                                         ▼
//!             Notification Dispatcher ◀── events ◀── persist ◀── SLA Evaluator
//! ```
//!
//! ## Features
//! - Ticket lifecycle with a one-way status machine
//! - First-response and resolution deadlines, periodic violation sweep
//! - Ordered, first-match access rules per action
//! - Per-event recipient resolution and fan-out
//! - Stock and damage events for inventory

pub mod access;
pub mod domain;
pub mod inventory;
pub mod notify;
pub mod repository;
pub mod service;
pub mod sla;
pub mod sweep;
pub mod usage;

pub use access::{AccessConfig, AccessPolicy, Action, Decision, Effect, TicketFacts};
pub use domain::*;
pub use inventory::InventoryService;
pub use notify::{DispatchReport, InMemoryNotifier, Notification, NotificationDispatcher, Notifier, TracingNotifier};
pub use repository::{
    EmployeeDirectory, InMemoryEmployeeDirectory, InMemoryProductRepository, InMemoryTicketRepository,
    ProductRepository, TicketFilter, TicketRepository,
};
pub use service::{SupportDeps, TicketService};
pub use sla::{ConfigError, SlaError, SlaEvaluator, SlaPolicy, SlaStatus, SlaTable, SlaTarget};
pub use sweep::{SlaScheduler, SlaSweeper, SweepSummary, MAX_SWEEP_INTERVAL};
pub use usage::UsageReporter;

use itdesk_common::RepositoryError;
use itdesk_tenant::{LifecycleError, Resource, ScopeError};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupportError {
    /// Missing, or owned by another company
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {action} denied by rule '{rule}'")]
    Forbidden { action: &'static str, rule: &'static str },

    #[error("{technical}")]
    BusinessRule { technical: String, user_message: String },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SupportError {
    pub fn business(technical: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self::BusinessRule { technical: technical.into(), user_message: user_message.into() }
    }

    pub fn denied(action: Action, decision: Decision) -> Self {
        Self::Forbidden { action: action.as_str(), rule: decision.rule }
    }

    /// Text that may be shown to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "The requested item does not exist.".into(),
            Self::Forbidden { .. } => "You are not allowed to do that.".into(),
            Self::BusinessRule { user_message, .. } => user_message.clone(),
            Self::Repository(_) => "Something went wrong on our side. Please try again.".into(),
        }
    }
}

impl From<TicketError> for SupportError {
    fn from(e: TicketError) -> Self {
        Self::business(e.to_string(), e.user_message())
    }
}

impl From<ProductError> for SupportError {
    fn from(e: ProductError) -> Self {
        Self::business(e.to_string(), e.user_message())
    }
}

impl From<LifecycleError> for SupportError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::NotFound => Self::NotFound("company".into()),
            LifecycleError::Suspended => {
                Self::business(e.to_string(), "Your company account is suspended. Changes are disabled.")
            }
            LifecycleError::Inactive => {
                Self::business(e.to_string(), "Your company account is inactive. Changes are disabled.")
            }
        }
    }
}

impl From<ScopeError> for SupportError {
    fn from(e: ScopeError) -> Self {
        Self::business(e.to_string(), "Records can only be created for your own company.")
    }
}

impl From<SlaError> for SupportError {
    fn from(e: SlaError) -> Self {
        Self::business(e.to_string(), "SLA data for this ticket is incomplete.")
    }
}

pub(crate) fn quota_exceeded(resource: Resource, limit: u32) -> SupportError {
    let what = match resource {
        Resource::Users => "users",
        Resource::Products => "products",
        Resource::TicketsPerMonth => "tickets this month",
    };
    SupportError::business(
        format!("{:?} quota of {} reached", resource, limit),
        format!("Your plan allows {} {}. Upgrade to add more.", limit, what),
    )
}

pub type SupportResult<T> = Result<T, SupportError>;
