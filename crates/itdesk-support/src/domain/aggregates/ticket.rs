//! Ticket Aggregate
//!
//! # Invariants
//! - `company_id` is fixed at creation
//! - status only moves toward `Closed`; a closed ticket accepts no change
//! - SLA flags are derived from deadlines and the clock, never set from input
use chrono::{DateTime, Utc};
use itdesk_common::{CommentId, CompanyId, EmployeeId, EventMetadata, ProductId, TicketId, UserId};
use itdesk_tenant::{TenantOwned, TenantStamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::SupportEvent;
use crate::domain::value_objects::{
    Priority, SlaDeadlines, SlaDimension, SlaFlags, TicketStatus, TicketType,
};

const AGGREGATE: &str = "Ticket";

/// Input for opening a ticket. The company is stamped by the tenant scope.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewTicket {
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), ..Default::default() }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl TenantOwned for NewTicket {
    fn company_id(&self) -> Option<CompanyId> { self.company_id }
}

impl TenantStamp for NewTicket {
    fn assign_company(&mut self, company_id: CompanyId) { self.company_id = Some(company_id); }
}

/// Editable fields. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub ticket_type: Option<TicketType>,
    pub product_id: Option<ProductId>,
    pub employee_id: Option<EmployeeId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    company_id: CompanyId,
    title: String,
    description: String,
    product_id: Option<ProductId>,
    employee_id: Option<EmployeeId>,
    opened_by: UserId,
    assigned_to: Option<UserId>,
    priority: Priority,
    ticket_type: TicketType,
    status: TicketStatus,
    resolution: Option<String>,
    first_response_deadline: Option<DateTime<Utc>>,
    resolution_deadline: Option<DateTime<Utc>>,
    first_response_at: Option<DateTime<Utc>>,
    first_response_violated: bool,
    resolution_violated: bool,
    sla_violated: bool,
    resolved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(skip)]
    events: Vec<SupportEvent>,
}

impl Ticket {
    pub fn open(
        draft: NewTicket,
        opened_by: UserId,
        deadlines: SlaDeadlines,
        now: DateTime<Utc>,
    ) -> Result<Self, TicketError> {
        let company_id = draft.company_id.ok_or(TicketError::MissingCompany)?;
        let title = draft.title.trim().to_string();
        if title.is_empty() { return Err(TicketError::EmptyTitle); }

        let mut t = Self {
            id: TicketId::new(), company_id, title, description: draft.description,
            product_id: draft.product_id, employee_id: draft.employee_id,
            opened_by, assigned_to: draft.assigned_to,
            priority: draft.priority, ticket_type: draft.ticket_type, status: TicketStatus::Open,
            resolution: None,
            first_response_deadline: Some(deadlines.first_response),
            resolution_deadline: Some(deadlines.resolution),
            first_response_at: None,
            first_response_violated: false, resolution_violated: false, sla_violated: false,
            resolved_at: None, closed_at: None, created_at: now, updated_at: now,
            version: 0, events: vec![],
        };
        t.raise_event(SupportEvent::TicketCreated {
            metadata: t.metadata(now), ticket_id: t.id, title: t.title.clone(),
            priority: t.priority, opened_by,
        });
        if let Some(assignee) = t.assigned_to {
            t.raise_event(SupportEvent::TicketAssigned {
                metadata: t.metadata(now), ticket_id: t.id, title: t.title.clone(),
                assignee, assigned_by: opened_by,
            });
        }
        Ok(t)
    }

    pub fn id(&self) -> &TicketId { &self.id }
    pub fn company(&self) -> CompanyId { self.company_id }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> &str { &self.description }
    pub fn product_id(&self) -> Option<ProductId> { self.product_id }
    pub fn employee_id(&self) -> Option<EmployeeId> { self.employee_id }
    pub fn opened_by(&self) -> UserId { self.opened_by }
    pub fn assigned_to(&self) -> Option<UserId> { self.assigned_to }
    pub fn priority(&self) -> Priority { self.priority }
    pub fn ticket_type(&self) -> TicketType { self.ticket_type }
    pub fn status(&self) -> TicketStatus { self.status }
    pub fn resolution(&self) -> Option<&str> { self.resolution.as_deref() }
    pub fn first_response_deadline(&self) -> Option<DateTime<Utc>> { self.first_response_deadline }
    pub fn resolution_deadline(&self) -> Option<DateTime<Utc>> { self.resolution_deadline }
    pub fn first_response_at(&self) -> Option<DateTime<Utc>> { self.first_response_at }
    pub fn sla_violated(&self) -> bool { self.sla_violated }
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> { self.resolved_at }
    pub fn closed_at(&self) -> Option<DateTime<Utc>> { self.closed_at }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn version(&self) -> u64 { self.version }
    pub fn is_closed(&self) -> bool { self.status == TicketStatus::Closed }

    pub fn sla_flags(&self) -> SlaFlags {
        SlaFlags { first_response: self.first_response_violated, resolution: self.resolution_violated }
    }

    /// Both deadlines, if the stored row carries them
    pub fn deadlines(&self) -> Option<SlaDeadlines> {
        Some(SlaDeadlines { first_response: self.first_response_deadline?, resolution: self.resolution_deadline? })
    }

    /// Apply field edits. Returns the names of the fields that changed.
    pub fn update(
        &mut self,
        changes: TicketChanges,
        new_deadlines: Option<SlaDeadlines>,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'static str>, TicketError> {
        self.ensure_open()?;
        let mut changed = vec![];
        if let Some(title) = changes.title {
            let title = title.trim().to_string();
            if title.is_empty() { return Err(TicketError::EmptyTitle); }
            if title != self.title { self.title = title; changed.push("title"); }
        }
        if let Some(description) = changes.description {
            if description != self.description { self.description = description; changed.push("description"); }
        }
        if let Some(priority) = changes.priority {
            if priority != self.priority {
                self.priority = priority;
                changed.push("priority");
                if let Some(d) = new_deadlines {
                    self.first_response_deadline = Some(d.first_response);
                    self.resolution_deadline = Some(d.resolution);
                }
            }
        }
        if let Some(ticket_type) = changes.ticket_type {
            if ticket_type != self.ticket_type { self.ticket_type = ticket_type; changed.push("type"); }
        }
        if changes.product_id.is_some() && changes.product_id != self.product_id {
            self.product_id = changes.product_id;
            changed.push("product");
        }
        if changes.employee_id.is_some() && changes.employee_id != self.employee_id {
            self.employee_id = changes.employee_id;
            changed.push("employee");
        }
        if !changed.is_empty() { self.touch(now); }
        Ok(changed)
    }

    pub fn assign(&mut self, assignee: UserId, actor: UserId, now: DateTime<Utc>) -> Result<(), TicketError> {
        self.ensure_open()?;
        if self.assigned_to == Some(assignee) { return Err(TicketError::AlreadyAssigned); }
        self.assigned_to = Some(assignee);
        self.touch(now);
        self.raise_event(SupportEvent::TicketAssigned {
            metadata: self.metadata(now), ticket_id: self.id, title: self.title.clone(),
            assignee, assigned_by: actor,
        });
        Ok(())
    }

    /// Move to `to`. Returns the previous status.
    pub fn change_status(
        &mut self,
        to: TicketStatus,
        resolution: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<TicketStatus, TicketError> {
        let from = self.status;
        if from == TicketStatus::Closed {
            return Err(if to == TicketStatus::Closed { TicketError::AlreadyClosed } else { TicketError::Closed });
        }
        if from == to { return Err(TicketError::SameStatus(to)); }
        if !from.can_transition_to(to) { return Err(TicketError::InvalidTransition { from, to }); }

        self.status = to;
        match to {
            TicketStatus::Resolved => self.resolved_at = Some(now),
            TicketStatus::Closed => {
                self.closed_at = Some(now);
                if self.resolved_at.is_none() { self.resolved_at = Some(now); }
            }
            TicketStatus::Open | TicketStatus::InProgress | TicketStatus::WaitingParts => {}
        }
        if let Some(text) = resolution.filter(|r| !r.trim().is_empty()) { self.resolution = Some(text); }
        self.note_response(actor, now);
        self.touch(now);
        self.raise_event(SupportEvent::TicketStatusChanged {
            metadata: self.metadata(now), ticket_id: self.id, title: self.title.clone(),
            from, to, changed_by: actor, opened_by: self.opened_by, assigned_to: self.assigned_to,
        });
        Ok(from)
    }

    pub fn close(&mut self, resolution: Option<String>, actor: UserId, now: DateTime<Utc>) -> Result<TicketStatus, TicketError> {
        self.change_status(TicketStatus::Closed, resolution, actor, now)
    }

    pub fn add_comment(
        &mut self,
        author: UserId,
        body: impl Into<String>,
        internal: bool,
        now: DateTime<Utc>,
    ) -> Result<TicketComment, TicketError> {
        self.ensure_open()?;
        let body = body.into();
        if body.trim().is_empty() { return Err(TicketError::EmptyComment); }
        let comment = TicketComment {
            id: CommentId::new(), ticket_id: self.id, company_id: self.company_id,
            author, body, internal, created_at: now,
        };
        self.note_response(author, now);
        self.touch(now);
        self.raise_event(SupportEvent::TicketCommented {
            metadata: self.metadata(now), ticket_id: self.id, title: self.title.clone(),
            comment_id: comment.id, author, internal, opened_by: self.opened_by, assigned_to: self.assigned_to,
        });
        Ok(comment)
    }

    /// Record freshly evaluated flags. Raises one `SlaViolated` per dimension
    /// that flips from clear to violated. Returns the previous flags.
    pub fn apply_sla_flags(&mut self, flags: SlaFlags, now: DateTime<Utc>) -> SlaFlags {
        let before = self.sla_flags();
        for kind in flags.newly_set_since(&before) {
            let deadline = match kind {
                SlaDimension::FirstResponse => self.first_response_deadline,
                SlaDimension::Resolution => self.resolution_deadline,
            }
            .unwrap_or(now);
            self.raise_event(SupportEvent::SlaViolated {
                metadata: self.metadata(now), ticket_id: self.id, title: self.title.clone(),
                priority: self.priority, kind, deadline, assigned_to: self.assigned_to,
            });
        }
        self.store_sla_flags(flags);
        before
    }

    /// Overwrite the flags without raising events. For persistence adapters.
    pub fn store_sla_flags(&mut self, flags: SlaFlags) {
        self.first_response_violated = flags.first_response;
        self.resolution_violated = flags.resolution;
        self.sla_violated = flags.any();
    }

    /// Set the stored version. For persistence adapters.
    pub fn mark_persisted(&mut self, version: u64) { self.version = version; }

    pub fn take_events(&mut self) -> Vec<SupportEvent> { std::mem::take(&mut self.events) }
    pub fn pending_events(&self) -> &[SupportEvent] { &self.events }

    fn ensure_open(&self) -> Result<(), TicketError> {
        if self.is_closed() { Err(TicketError::Closed) } else { Ok(()) }
    }
    fn note_response(&mut self, by: UserId, now: DateTime<Utc>) {
        if self.first_response_at.is_none() && by != self.opened_by { self.first_response_at = Some(now); }
    }
    fn metadata(&self, now: DateTime<Utc>) -> EventMetadata { EventMetadata::new(self.company_id, self.id, AGGREGATE, now) }
    fn raise_event(&mut self, e: SupportEvent) { self.events.push(e); }
    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

impl TenantOwned for Ticket {
    fn company_id(&self) -> Option<CompanyId> { Some(self.company_id) }
}

/// Append-only comment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub company_id: CompanyId,
    pub author: UserId,
    pub body: String,
    pub internal: bool,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for TicketComment {
    fn company_id(&self) -> Option<CompanyId> { Some(self.company_id) }
}

/// Audit trail entry; tenancy comes from the ticket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketLog {
    pub id: Uuid,
    pub ticket_id: TicketId,
    pub actor: Option<UserId>,
    pub action: LogAction,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl TicketLog {
    pub fn new(ticket_id: TicketId, actor: Option<UserId>, action: LogAction, detail: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4(), ticket_id, actor, action, detail: detail.into(), created_at: at }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction { Created, Updated, Assigned, StatusChanged, Commented, SlaViolated, SlaCleared }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TicketError {
    #[error("ticket draft has no company")]
    MissingCompany,
    #[error("ticket title is empty")]
    EmptyTitle,
    #[error("comment body is empty")]
    EmptyComment,
    #[error("ticket is closed")]
    Closed,
    #[error("ticket is already closed")]
    AlreadyClosed,
    #[error("ticket is already assigned to that user")]
    AlreadyAssigned,
    #[error("ticket is already {0}")]
    SameStatus(TicketStatus),
    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },
}

impl TicketError {
    /// Message safe to show to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCompany => "Tickets must belong to a company.".into(),
            Self::EmptyTitle => "Please give the ticket a title.".into(),
            Self::EmptyComment => "A comment cannot be empty.".into(),
            Self::Closed => "This ticket is closed and can no longer be changed.".into(),
            Self::AlreadyClosed => "This ticket is already closed.".into(),
            Self::AlreadyAssigned => "The ticket is already assigned to this person.".into(),
            Self::SameStatus(s) => format!("The ticket is already in status '{}'.", s),
            Self::InvalidTransition { from, to } => format!("A ticket in status '{}' cannot move to '{}'.", from, to),
        }
    }
}
