//! SLA Policy Evaluator
//!
//! Deadlines are fixed when a ticket is opened (and recomputed from the
//! original `created_at` when its priority changes). Violation flags are a
//! pure function of the deadlines, the ticket state and the clock:
//!
//! - first response violated: no response yet and `now > first_response_deadline`
//! - resolution violated: not resolved/closed and `now > resolution_deadline`
//!
//! Resolved and closed tickets keep the flags they had when they settled.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use itdesk_common::TicketId;
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, SlaDeadlines, SlaDimension, SlaFlags, Ticket};

/// Durations for one priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaTarget {
    pub first_response_minutes: u32,
    pub resolution_minutes: u32,
}

impl SlaTarget {
    pub const fn hours(first_response: u32, resolution: u32) -> Self {
        Self { first_response_minutes: first_response * 60, resolution_minutes: resolution * 60 }
    }
}

/// Priority → duration table. Missing rows keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaTable {
    pub low: SlaTarget,
    pub medium: SlaTarget,
    pub high: SlaTarget,
    pub critical: SlaTarget,
}

impl Default for SlaTable {
    fn default() -> Self {
        Self {
            low: SlaTarget::hours(24, 72),
            medium: SlaTarget::hours(8, 48),
            high: SlaTarget::hours(4, 24),
            critical: SlaTarget::hours(1, 4),
        }
    }
}

impl SlaTable {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for priority in Priority::ALL {
            let t = self.target(priority);
            if t.first_response_minutes == 0 || t.resolution_minutes == 0 {
                return Err(ConfigError::NonPositiveDuration { priority });
            }
            if t.resolution_minutes < t.first_response_minutes {
                return Err(ConfigError::ResolutionBeforeResponse { priority });
            }
        }
        Ok(())
    }

    pub fn target(&self, priority: Priority) -> SlaTarget {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }
}

/// Source of SLA durations
pub trait SlaPolicy: Send + Sync {
    fn target(&self, priority: Priority) -> SlaTarget;
}

impl SlaPolicy for SlaTable {
    fn target(&self, priority: Priority) -> SlaTarget {
        SlaTable::target(self, priority)
    }
}

/// Point-in-time SLA report for one ticket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub ticket_id: TicketId,
    pub first_response_deadline: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub first_response_violated: bool,
    pub resolution_violated: bool,
    pub sla_violated: bool,
    /// Minutes left on the first-response clock; `None` once it stopped
    pub first_response_remaining_minutes: Option<i64>,
    /// Minutes left on the resolution clock; `None` once it stopped
    pub resolution_remaining_minutes: Option<i64>,
    pub evaluated_at: DateTime<Utc>,
}

impl SlaStatus {
    pub fn flags(&self) -> SlaFlags {
        SlaFlags { first_response: self.first_response_violated, resolution: self.resolution_violated }
    }
}

/// Flag movement produced by one reconcile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SlaChange {
    pub before: SlaFlags,
    pub after: SlaFlags,
}

impl SlaChange {
    pub fn changed(&self) -> bool { self.before != self.after }
    pub fn newly_violated(&self) -> Vec<SlaDimension> { self.after.newly_set_since(&self.before) }
    /// Dimensions that went from violated back to clear
    pub fn cleared_dimensions(&self) -> Vec<SlaDimension> { self.before.newly_set_since(&self.after) }
    pub fn cleared(&self) -> bool { !self.cleared_dimensions().is_empty() }
}

#[derive(Clone)]
pub struct SlaEvaluator {
    policy: Arc<dyn SlaPolicy>,
}

impl SlaEvaluator {
    pub fn new(policy: Arc<dyn SlaPolicy>) -> Self {
        Self { policy }
    }

    pub fn deadlines(&self, priority: Priority, created_at: DateTime<Utc>) -> SlaDeadlines {
        let t = self.policy.target(priority);
        SlaDeadlines {
            first_response: created_at + Duration::minutes(i64::from(t.first_response_minutes)),
            resolution: created_at + Duration::minutes(i64::from(t.resolution_minutes)),
        }
    }

    /// Evaluate without touching the ticket
    pub fn evaluate(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<SlaStatus, SlaError> {
        let id = *ticket.id();
        let first_response_deadline = ticket
            .first_response_deadline()
            .ok_or(SlaError::MissingDeadline { ticket_id: id, dimension: SlaDimension::FirstResponse })?;
        let resolution_deadline = ticket
            .resolution_deadline()
            .ok_or(SlaError::MissingDeadline { ticket_id: id, dimension: SlaDimension::Resolution })?;
        if resolution_deadline < first_response_deadline {
            return Err(SlaError::InconsistentDeadlines { ticket_id: id });
        }

        let settled = ticket.status().is_settled();
        let responded = ticket.first_response_at().is_some();
        let flags = if settled {
            ticket.sla_flags()
        } else {
            SlaFlags {
                first_response: !responded && now > first_response_deadline,
                resolution: now > resolution_deadline,
            }
        };
        let remaining = |deadline: DateTime<Utc>| (deadline - now).num_minutes();

        Ok(SlaStatus {
            ticket_id: id,
            first_response_deadline,
            resolution_deadline,
            first_response_violated: flags.first_response,
            resolution_violated: flags.resolution,
            sla_violated: flags.any(),
            first_response_remaining_minutes: (!settled && !responded).then(|| remaining(first_response_deadline)),
            resolution_remaining_minutes: (!settled).then(|| remaining(resolution_deadline)),
            evaluated_at: now,
        })
    }

    /// Evaluate and record the flags on the ticket, raising `SlaViolated`
    /// for every dimension that just became violated. Settled tickets are
    /// left untouched.
    pub fn reconcile(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> Result<SlaChange, SlaError> {
        let status = self.evaluate(ticket, now)?;
        if ticket.status().is_settled() {
            let flags = ticket.sla_flags();
            return Ok(SlaChange { before: flags, after: flags });
        }
        let after = status.flags();
        let before = ticket.apply_sla_flags(after, now);
        Ok(SlaChange { before, after })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlaError {
    #[error("ticket {ticket_id} has no {dimension} deadline")]
    MissingDeadline { ticket_id: TicketId, dimension: SlaDimension },
    #[error("ticket {ticket_id} resolution deadline precedes its first-response deadline")]
    InconsistentDeadlines { ticket_id: TicketId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("SLA durations for {priority} priority must be positive")]
    NonPositiveDuration { priority: Priority },
    #[error("SLA resolution time for {priority} priority is shorter than its first-response time")]
    ResolutionBeforeResponse { priority: Priority },
    #[error("sweep interval must be between 1 and 3600 seconds, got {0}")]
    SweepInterval(u64),
    #[error("{0}")]
    Invalid(String),
}
