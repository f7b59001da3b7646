//! Cross-tenant visibility through the service layer

mod common;

use common::Harness;
use itdesk_common::{CompanyId, TicketId};
use itdesk_support::{NewTicket, Priority, SupportError, TicketFilter, TicketStatus};
use itdesk_tenant::{Role, User, UserDirectory};

#[tokio::test]
async fn other_company_ticket_is_not_found() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let globex = h.tenant("Globex").await;
    let t = h.open(&acme.viewer, "Acme laptop", Priority::Medium).await;

    let err = h.service.get_ticket(&globex.admin, t.id()).await.unwrap_err();
    assert!(matches!(err, SupportError::NotFound(_)));

    // same answer as for an id that never existed
    let missing = h.service.get_ticket(&globex.admin, &TicketId::new()).await.unwrap_err();
    assert_eq!(std::mem::discriminant(&err), std::mem::discriminant(&missing));

    let err = h.service.close_ticket(&globex.admin, t.id(), None).await.unwrap_err();
    assert!(matches!(err, SupportError::NotFound(_)), "not-found wins over forbidden");
}

#[tokio::test]
async fn lists_never_cross_tenants() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let globex = h.tenant("Globex").await;
    h.open(&acme.viewer, "A1", Priority::Low).await;
    h.open(&acme.viewer, "A2", Priority::Low).await;
    h.open(&globex.viewer, "G1", Priority::Low).await;

    let all = TicketFilter::default();
    assert_eq!(h.service.list_tickets(&acme.admin, &all).await.unwrap().len(), 2);
    assert_eq!(h.service.list_tickets(&globex.manager, &all).await.unwrap().len(), 1);
}

#[tokio::test]
async fn company_less_user_sees_nothing_and_cannot_create() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let t = h.open(&acme.viewer, "A1", Priority::Low).await;
    let onboarding = User::new(None, "New", "new@x.test", &[Role::Admin]);
    h.users.save(&onboarding).await.unwrap();

    assert!(h.service.list_tickets(&onboarding, &TicketFilter::default()).await.unwrap().is_empty());
    assert!(matches!(h.service.get_ticket(&onboarding, t.id()).await, Err(SupportError::NotFound(_))));
    let err = h.service.create_ticket(&onboarding, NewTicket::new("x", "")).await.unwrap_err();
    assert_eq!(err, SupportError::Forbidden { action: "create", rule: "no-company" });
}

#[tokio::test]
async fn preset_foreign_company_is_rejected() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let mut draft = NewTicket::new("Sneaky", "");
    draft.company_id = Some(CompanyId::new());

    let err = h.service.create_ticket(&acme.admin, draft).await.unwrap_err();
    assert!(matches!(err, SupportError::BusinessRule { .. }));
    assert!(h.tickets.is_empty());
}

#[tokio::test]
async fn foreign_assignee_is_rejected() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let globex = h.tenant("Globex").await;
    let t = h.open(&acme.viewer, "A1", Priority::Low).await;

    let err = h.service.assign_ticket(&acme.admin, t.id(), globex.tech.id).await.unwrap_err();
    assert!(matches!(err, SupportError::BusinessRule { .. }));
    let stored = h.service.get_ticket(&acme.admin, t.id()).await.unwrap();
    assert_eq!(stored.assigned_to(), None);
    assert_eq!(stored.status(), TicketStatus::Open);
}

#[tokio::test]
async fn usage_is_per_company() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let globex = h.tenant("Globex").await;
    h.open(&acme.viewer, "A1", Priority::Low).await;
    h.open(&acme.viewer, "A2", Priority::Low).await;
    h.open(&globex.viewer, "G1", Priority::Low).await;

    let usage = h.deps.usage().usage(acme.company.id).await.unwrap();
    assert_eq!(usage.tickets_this_month, 2);
    assert_eq!(usage.open_tickets, 2);
    assert_eq!(usage.users, 4);
    assert_eq!(h.deps.usage().all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn foreign_manager_cannot_assign() {
    let h = Harness::new();
    let acme = h.tenant("Acme").await;
    let globex = h.tenant("Globex").await;
    let t = h.open(&acme.viewer, "A1", Priority::High).await;

    let err = h.service.assign_ticket(&globex.manager, t.id(), globex.tech.id).await.unwrap_err();
    assert!(matches!(err, SupportError::NotFound(_)));
    assert_eq!(h.service.get_ticket(&acme.admin, t.id()).await.unwrap().assigned_to(), None);
}
