//! End-to-end ticket operations through the service

mod common;

use chrono::Duration;
use common::Harness;
use itdesk_support::{
    AccessConfig, Employee, LogAction, NewTicket, Priority, Product, SupportError, TicketChanges, TicketFilter,
    TicketStatus,
};
use itdesk_tenant::PlanTier;

#[tokio::test]
async fn viewer_sees_own_tickets_only() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let own = h.open(&acme.viewer, "Mine", Priority::Low).await;
    let other = h.open(&acme.admin, "Not mine", Priority::Low).await;

    assert!(h.service.get_ticket(&acme.viewer, own.id()).await.is_ok());
    let err = h.service.get_ticket(&acme.viewer, other.id()).await.unwrap_err();
    assert_eq!(err, SupportError::Forbidden { action: "view", rule: "default-deny" });

    let listed = h.service.list_tickets(&acme.viewer, &TicketFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn assigned_technician_moves_status_but_cannot_close() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Broken screen", Priority::High).await;

    let denied = h.service.change_status(&acme.tech, t.id(), TicketStatus::InProgress, None).await;
    assert!(matches!(denied, Err(SupportError::Forbidden { .. })));

    h.service.assign_ticket(&acme.manager, t.id(), acme.tech.id).await.unwrap();
    let moved = h.service.change_status(&acme.tech, t.id(), TicketStatus::InProgress, None).await.unwrap();
    assert_eq!(moved.status(), TicketStatus::InProgress);
    assert!(moved.first_response_at().is_some());

    let close = h.service.change_status(&acme.tech, t.id(), TicketStatus::Closed, None).await;
    assert_eq!(close.unwrap_err(), SupportError::Forbidden { action: "close", rule: "default-deny" });
}

#[tokio::test]
async fn closed_ticket_rejects_everything() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Old", Priority::Low).await;
    h.service.close_ticket(&acme.admin, t.id(), Some("duplicate".into())).await.unwrap();

    let update = TicketChanges { title: Some("New title".into()), ..Default::default() };
    let err = h.service.update_ticket(&acme.admin, t.id(), update).await.unwrap_err();
    assert_eq!(err, SupportError::Forbidden { action: "update", rule: "ticket-closed" });

    let err = h.service.close_ticket(&acme.admin, t.id(), None).await.unwrap_err();
    assert!(matches!(err, SupportError::BusinessRule { .. }));
    assert_eq!(err.user_message(), "This ticket is already closed.");
}

#[tokio::test]
async fn priority_change_recomputes_deadlines_from_creation() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Slow VPN", Priority::Low).await;
    let created = t.created_at();

    h.clock.advance(Duration::minutes(90));
    let changes = TicketChanges { priority: Some(Priority::Critical), ..Default::default() };
    let updated = h.service.update_ticket(&acme.admin, t.id(), changes).await.unwrap();

    assert_eq!(updated.first_response_deadline(), Some(created + Duration::hours(1)));
    assert_eq!(updated.resolution_deadline(), Some(created + Duration::hours(4)));
    assert!(updated.sla_flags().first_response, "the new deadline already passed");
}

#[tokio::test]
async fn comments_and_audit_log() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Printer", Priority::Medium).await;
    h.service.assign_ticket(&acme.admin, t.id(), acme.tech.id).await.unwrap();
    h.notifier.clear();

    h.service.add_comment(&acme.tech, t.id(), "Ordered a new fuser", false).await.unwrap();
    h.service.add_comment(&acme.tech, t.id(), "Supplier is slow", true).await.unwrap();

    assert_eq!(h.service.comments(&acme.viewer, t.id()).await.unwrap().len(), 1);
    assert_eq!(h.service.comments(&acme.admin, t.id()).await.unwrap().len(), 2);
    assert!(h.notifier.sent_to(acme.viewer.id).len() == 1, "viewer only hears about the public comment");

    let err = h.service.add_comment(&acme.viewer, t.id(), "psst", true).await.unwrap_err();
    assert!(matches!(err, SupportError::Forbidden { .. }));
    assert!(h.service.add_comment(&acme.viewer, t.id(), "   ", false).await.is_err());

    let actions: Vec<LogAction> = h.service.logs(&acme.admin, t.id()).await.unwrap().iter().map(|l| l.action).collect();
    assert_eq!(
        actions,
        vec![LogAction::Created, LogAction::Assigned, LogAction::Commented, LogAction::Commented]
    );
}

#[tokio::test]
async fn delete_is_supervisor_only_and_cascades() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.tech, "Temp", Priority::Low).await;
    h.service.add_comment(&acme.tech, t.id(), "note", false).await.unwrap();

    let err = h.service.delete_ticket(&acme.tech, t.id()).await.unwrap_err();
    assert!(matches!(err, SupportError::Forbidden { .. }));

    h.service.delete_ticket(&acme.manager, t.id()).await.unwrap();
    assert!(matches!(h.service.get_ticket(&acme.manager, t.id()).await, Err(SupportError::NotFound(_))));
    assert!(h.tickets.is_empty());
}

#[tokio::test]
async fn suspended_company_is_read_only() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Before", Priority::Low).await;
    h.companies.suspend(&acme.company.id, h.deps.clock.now()).unwrap();

    assert!(h.service.get_ticket(&acme.admin, t.id()).await.is_ok());
    let err = h.service.create_ticket(&acme.admin, NewTicket::new("After", "")).await.unwrap_err();
    assert!(matches!(err, SupportError::BusinessRule { .. }));
    let err = h.service.assign_ticket(&acme.admin, t.id(), acme.tech.id).await.unwrap_err();
    assert!(err.user_message().contains("suspended"));
}

#[tokio::test]
async fn monthly_ticket_quota() {
    let h = Harness::new();
    let acme = h.tenant_on("Acme", PlanTier::Free).await;
    for i in 0..30 {
        h.open(&acme.viewer, &format!("Ticket {}", i), Priority::Low).await;
    }
    let err = h.service.create_ticket(&acme.viewer, NewTicket::new("One more", "")).await.unwrap_err();
    assert!(matches!(err, SupportError::BusinessRule { .. }));

    // a new month resets the count
    h.clock.advance(Duration::days(31));
    assert!(h.service.create_ticket(&acme.viewer, NewTicket::new("May", "")).await.is_ok());
}

#[tokio::test]
async fn linked_employee_may_change_status() {
    let h = Harness::with_access(AccessConfig { allow_employee_email_link: true });
    let acme = h.tenant("Acme").await;
    let employee = h
        .service
        .register_employee(&acme.admin, Employee::new("Tom", acme.tech.email.to_uppercase()))
        .await
        .unwrap();

    let mut draft = NewTicket::new("Tom's laptop", "");
    draft.employee_id = Some(employee.id);
    let t = h.service.create_ticket(&acme.viewer, draft).await.unwrap();

    let moved = h.service.change_status(&acme.tech, t.id(), TicketStatus::WaitingParts, None).await.unwrap();
    assert_eq!(moved.status(), TicketStatus::WaitingParts);
}

#[tokio::test]
async fn inventory_events_reach_staff() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let inventory = itdesk_support::InventoryService::new(h.deps.clone());
    let dock = inventory
        .add_product(&acme.admin, Product::new("USB-C dock", 4, 3, h.deps.clock.now()))
        .await
        .unwrap();
    h.notifier.clear();

    inventory.adjust_stock(&acme.tech, dock.id(), -2).await.unwrap();
    let low: Vec<_> = h.notifier.sent().into_iter().filter(|n| n.event_type == "product.low_stock").collect();
    assert_eq!(low.len(), 2, "admin and manager");

    h.notifier.clear();
    inventory.mark_damaged(&acme.admin, dock.id()).await.unwrap();
    assert_eq!(h.notifier.sent().len(), 2, "manager and technician, never the reporter");

    let err = inventory.adjust_stock(&acme.viewer, dock.id(), 1).await.unwrap_err();
    assert!(matches!(err, SupportError::Forbidden { .. }));
}

#[tokio::test]
async fn late_comment_records_breach_and_comment_together() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "Core switch down", Priority::Critical).await;
    h.notifier.clear();
    h.clock.advance(Duration::minutes(65));

    // no sweep ran; the comment itself discovers the missed deadline
    let comment = h.service.add_comment(&acme.manager, t.id(), "Looking now", false).await.unwrap();
    assert_eq!(h.service.comments(&acme.admin, t.id()).await.unwrap(), vec![comment]);

    let stored = h.service.get_ticket(&acme.admin, t.id()).await.unwrap();
    assert!(stored.first_response_at().is_some());

    let logs = h.service.logs(&acme.admin, t.id()).await.unwrap();
    let actions: Vec<LogAction> = logs.iter().map(|l| l.action).collect();
    assert_eq!(
        actions,
        vec![LogAction::Created, LogAction::Commented, LogAction::SlaViolated, LogAction::SlaCleared]
    );
    assert_eq!(logs[2].detail, "first_response deadline passed");
    assert!(h.notifier.sent().iter().any(|n| n.event_type == "ticket.sla_violated"));
}
