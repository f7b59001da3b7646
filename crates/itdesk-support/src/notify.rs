//! Notification Dispatcher
//!
//! Turns [`SupportEvent`]s into per-recipient notifications. Delivery
//! problems are logged and counted, they never fail the operation that
//! raised the event.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use itdesk_common::{CompanyId, DomainEvent, RepoResult, UserId};
use itdesk_tenant::{Role, UserDirectory};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::domain::SupportEvent;

const SUPERVISORS: &[Role] = &[Role::Admin, Role::Manager];
const STAFF: &[Role] = &[Role::Admin, Role::Manager, Role::Technician];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub company_id: CompanyId,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: UserId, reason: String },
}

/// Delivery channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Collects notifications in memory (tests, development)
#[derive(Default)]
pub struct InMemoryNotifier {
    outbox: Mutex<Vec<Notification>>,
    unreachable: Mutex<HashSet<UserId>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `user` fail
    pub fn fail_for(&self, user: UserId) {
        self.unreachable.lock().insert(user);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.outbox.lock().clone()
    }

    pub fn sent_to(&self, user: UserId) -> Vec<Notification> {
        self.outbox.lock().iter().filter(|n| n.recipient == user).cloned().collect()
    }

    pub fn clear(&self) {
        self.outbox.lock().clear();
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.unreachable.lock().contains(&notification.recipient) {
            return Err(NotifyError::Delivery {
                recipient: notification.recipient,
                reason: "recipient unreachable".into(),
            });
        }
        self.outbox.lock().push(notification.clone());
        Ok(())
    }
}

/// Writes notifications to the log; the default channel of the server
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(&self, n: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %n.recipient,
            company_id = %n.company_id,
            event_type = %n.event_type,
            title = %n.title,
            "notification"
        );
        Ok(())
    }
}

/// Outcome of fanning out one or more events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub recipients: Vec<UserId>,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.recipients.extend(other.recipients);
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn UserDirectory>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { notifier, directory }
    }

    pub async fn dispatch_all(&self, events: &[SupportEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for event in events {
            report.merge(self.dispatch(event).await);
        }
        report
    }

    pub async fn dispatch(&self, event: &SupportEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let recipients = match self.recipients(event).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(event_type = event.event_type(), error = %e, "recipient lookup failed");
                report.failed += 1;
                return report;
            }
        };

        let (title, message) = describe(event);
        let data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        for recipient in recipients {
            let notification = Notification {
                recipient,
                company_id: event.metadata().company_id,
                event_type: event.event_type().to_string(),
                title: title.clone(),
                message: message.clone(),
                data: data.clone(),
            };
            match self.notifier.deliver(&notification).await {
                Ok(()) => {
                    report.delivered += 1;
                    report.recipients.push(recipient);
                }
                Err(e) => {
                    tracing::warn!(event_type = event.event_type(), %recipient, error = %e, "notification not delivered");
                    report.failed += 1;
                }
            }
        }
        tracing::debug!(
            event_type = event.event_type(),
            delivered = report.delivered,
            failed = report.failed,
            "event dispatched"
        );
        report
    }

    /// Who hears about `event`: deduplicated, members of the event's
    /// company only, never the actor
    pub async fn recipients(&self, event: &SupportEvent) -> RepoResult<Vec<UserId>> {
        let company = event.metadata().company_id;
        let mut named: Vec<UserId> = vec![];
        let mut by_role: &[Role] = &[];

        match event {
            SupportEvent::TicketCreated { .. } | SupportEvent::LowStock { .. } => by_role = SUPERVISORS,
            SupportEvent::TicketAssigned { assignee, .. } => named.push(*assignee),
            SupportEvent::TicketCommented { internal: true, assigned_to, .. } => {
                named.extend(assigned_to);
                by_role = SUPERVISORS;
            }
            SupportEvent::TicketCommented { opened_by, assigned_to, .. }
            | SupportEvent::TicketStatusChanged { opened_by, assigned_to, .. } => {
                named.push(*opened_by);
                named.extend(assigned_to);
            }
            SupportEvent::SlaViolated { assigned_to, .. } => {
                named.extend(assigned_to);
                by_role = SUPERVISORS;
            }
            SupportEvent::ProductDamaged { .. } => by_role = STAFF,
        }

        let mut candidates = vec![];
        for id in named {
            if let Some(user) = self.directory.get(&id).await? {
                if user.belongs_to(company) {
                    candidates.push(user.id);
                }
            }
        }
        if !by_role.is_empty() {
            candidates.extend(self.directory.members_with_roles(&company, by_role).await?.into_iter().map(|u| u.id));
        }

        let actor = event.actor();
        let mut seen = HashSet::new();
        candidates.retain(|id| Some(*id) != actor && seen.insert(*id));
        Ok(candidates)
    }
}

fn describe(event: &SupportEvent) -> (String, String) {
    match event {
        SupportEvent::TicketCreated { title, priority, .. } => {
            ("New ticket".into(), format!("Ticket '{}' was opened with {} priority.", title, priority))
        }
        SupportEvent::TicketAssigned { title, .. } => {
            ("Ticket assigned".into(), format!("Ticket '{}' was assigned to you.", title))
        }
        SupportEvent::TicketCommented { title, internal, .. } => {
            let kind = if *internal { "internal note" } else { "comment" };
            ("New comment".into(), format!("A new {} was added to ticket '{}'.", kind, title))
        }
        SupportEvent::TicketStatusChanged { title, from, to, .. } => {
            ("Status changed".into(), format!("Ticket '{}' moved from {} to {}.", title, from, to))
        }
        SupportEvent::SlaViolated { title, kind, priority, .. } => (
            "SLA violated".into(),
            format!("Ticket '{}' ({} priority) missed its {} deadline.", title, priority, kind),
        ),
        SupportEvent::LowStock { name, quantity, minimum, .. } => (
            "Low stock".into(),
            format!("Product '{}' is down to {} units (minimum {}).", name, quantity, minimum),
        ),
        SupportEvent::ProductDamaged { name, .. } => {
            ("Damaged product".into(), format!("Product '{}' was reported damaged.", name))
        }
    }
}
