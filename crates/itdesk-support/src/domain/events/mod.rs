//! Support domain events
//!
//! Plain records of what happened. Who gets told, and how, is decided by the
//! [`NotificationDispatcher`](crate::notify::NotificationDispatcher).
use crate::domain::value_objects::{Priority, SlaDimension, TicketStatus};
use chrono::{DateTime, Utc};
use itdesk_common::{CommentId, DomainEvent, EventMetadata, ProductId, TicketId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupportEvent {
    TicketCreated {
        metadata: EventMetadata,
        ticket_id: TicketId,
        title: String,
        priority: Priority,
        opened_by: UserId,
    },
    TicketAssigned {
        metadata: EventMetadata,
        ticket_id: TicketId,
        title: String,
        assignee: UserId,
        assigned_by: UserId,
    },
    TicketCommented {
        metadata: EventMetadata,
        ticket_id: TicketId,
        title: String,
        comment_id: CommentId,
        author: UserId,
        internal: bool,
        opened_by: UserId,
        assigned_to: Option<UserId>,
    },
    TicketStatusChanged {
        metadata: EventMetadata,
        ticket_id: TicketId,
        title: String,
        from: TicketStatus,
        to: TicketStatus,
        changed_by: UserId,
        opened_by: UserId,
        assigned_to: Option<UserId>,
    },
    SlaViolated {
        metadata: EventMetadata,
        ticket_id: TicketId,
        title: String,
        priority: Priority,
        kind: SlaDimension,
        deadline: DateTime<Utc>,
        assigned_to: Option<UserId>,
    },
    LowStock {
        metadata: EventMetadata,
        product_id: ProductId,
        name: String,
        quantity: u32,
        minimum: u32,
        changed_by: UserId,
    },
    ProductDamaged {
        metadata: EventMetadata,
        product_id: ProductId,
        name: String,
        reported_by: UserId,
    },
}

impl SupportEvent {
    /// User whose action raised the event; `None` for system-raised events
    pub fn actor(&self) -> Option<UserId> {
        match self {
            Self::TicketCreated { opened_by, .. } => Some(*opened_by),
            Self::TicketAssigned { assigned_by, .. } => Some(*assigned_by),
            Self::TicketCommented { author, .. } => Some(*author),
            Self::TicketStatusChanged { changed_by, .. } => Some(*changed_by),
            Self::SlaViolated { .. } => None,
            Self::LowStock { changed_by, .. } => Some(*changed_by),
            Self::ProductDamaged { reported_by, .. } => Some(*reported_by),
        }
    }

    pub fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketAssigned { ticket_id, .. }
            | Self::TicketCommented { ticket_id, .. }
            | Self::TicketStatusChanged { ticket_id, .. }
            | Self::SlaViolated { ticket_id, .. } => Some(*ticket_id),
            Self::LowStock { .. } | Self::ProductDamaged { .. } => None,
        }
    }
}

impl DomainEvent for SupportEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::TicketCreated { .. } => "ticket.created",
            Self::TicketAssigned { .. } => "ticket.assigned",
            Self::TicketCommented { .. } => "ticket.commented",
            Self::TicketStatusChanged { .. } => "ticket.status_changed",
            Self::SlaViolated { .. } => "ticket.sla_violated",
            Self::LowStock { .. } => "product.low_stock",
            Self::ProductDamaged { .. } => "product.damaged",
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::TicketCreated { metadata, .. }
            | Self::TicketAssigned { metadata, .. }
            | Self::TicketCommented { metadata, .. }
            | Self::TicketStatusChanged { metadata, .. }
            | Self::SlaViolated { metadata, .. }
            | Self::LowStock { metadata, .. }
            | Self::ProductDamaged { metadata, .. } => metadata,
        }
    }
}
