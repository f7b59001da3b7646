//! Repositories - persistence collaborators of the support domain
//!
//! Every read of a tenant-owned row takes a [`TenantScope`]; rows outside the
//! scope are indistinguishable from missing ones. Ticket and product writes
//! are compare-and-set on `version`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use itdesk_common::{EmployeeId, ProductId, RepoResult, RepositoryError, TicketId, UserId};
use itdesk_tenant::{SystemContext, TenantOwned, TenantScope};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{Employee, Priority, Product, SlaFlags, Ticket, TicketComment, TicketLog, TicketStatus};

/// Ticket list filter. Unset fields match everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
    pub sla_violated: Option<bool>,
    pub created_since: Option<DateTime<Utc>>,
}

impl TicketFilter {
    pub fn matches(&self, t: &Ticket) -> bool {
        self.status.map_or(true, |s| t.status() == s)
            && self.priority.map_or(true, |p| t.priority() == p)
            && self.assigned_to.map_or(true, |a| t.assigned_to() == Some(a))
            && self.sla_violated.map_or(true, |v| t.sla_violated() == v)
            && self.created_since.map_or(true, |since| t.created_at() >= since)
    }
}

/// Ticket Repository trait
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Store a new ticket; its company must already be stamped
    async fn insert(&self, ticket: &Ticket) -> RepoResult<()>;

    async fn find(&self, scope: TenantScope, id: &TicketId) -> RepoResult<Option<Ticket>>;

    /// Newest first
    async fn list(&self, scope: TenantScope, filter: &TicketFilter) -> RepoResult<Vec<Ticket>>;

    /// Replace the stored ticket if its version still equals `ticket.version()`.
    /// Returns the new version; `Conflict` when someone else wrote first.
    async fn save(&self, ticket: &Ticket) -> RepoResult<u64>;

    /// [`save`](Self::save) and append `comment` as one write. Nothing is
    /// stored when the version check fails.
    async fn save_with_comment(&self, ticket: &Ticket, comment: &TicketComment) -> RepoResult<u64>;

    /// Conditional write of the derived SLA flags. `Ok(false)` when the
    /// ticket moved past `expected_version` or no longer exists.
    async fn update_sla_flags(&self, id: &TicketId, expected_version: u64, flags: SlaFlags) -> RepoResult<bool>;

    /// Remove a ticket with its comments and logs
    async fn delete(&self, scope: TenantScope, id: &TicketId) -> RepoResult<bool>;

    /// Non-settled tickets of every company
    async fn sweep_candidates(&self, ctx: &SystemContext) -> RepoResult<Vec<Ticket>>;

    async fn comments(&self, scope: TenantScope, id: &TicketId) -> RepoResult<Vec<TicketComment>>;

    async fn append_log(&self, log: &TicketLog) -> RepoResult<()>;
    async fn logs(&self, id: &TicketId) -> RepoResult<Vec<TicketLog>>;
}

/// In-memory ticket repository (for testing and development)
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: DashMap<TicketId, Ticket>,
    comments: DashMap<TicketId, Vec<TicketComment>>,
    logs: DashMap<TicketId, Vec<TicketLog>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Version check and replace under the row's shard lock
    fn write(&self, ticket: &Ticket, comment: Option<&TicketComment>) -> RepoResult<u64> {
        let mut stored = self
            .tickets
            .get_mut(ticket.id())
            .ok_or_else(|| RepositoryError::NotFound(ticket.id().to_string()))?;
        if stored.version() != ticket.version() {
            return Err(RepositoryError::Conflict(format!(
                "ticket {} is at version {}, write based on {}",
                ticket.id(),
                stored.version(),
                ticket.version()
            )));
        }
        if let Some(comment) = comment {
            self.comments.entry(comment.ticket_id).or_default().push(comment.clone());
        }
        let next = ticket.version() + 1;
        let mut row = ticket.clone();
        row.take_events();
        row.mark_persisted(next);
        *stored = row;
        Ok(next)
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> RepoResult<()> {
        match self.tickets.entry(*ticket.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RepositoryError::Conflict(format!("ticket {} already exists", ticket.id())))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, scope: TenantScope, id: &TicketId) -> RepoResult<Option<Ticket>> {
        Ok(scope.visible(self.tickets.get(id).map(|t| t.clone())))
    }

    async fn list(&self, scope: TenantScope, filter: &TicketFilter) -> RepoResult<Vec<Ticket>> {
        let mut rows: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| scope.admits(t.value()) && filter.matches(t.value()))
            .map(|t| t.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(rows)
    }

    async fn save(&self, ticket: &Ticket) -> RepoResult<u64> {
        self.write(ticket, None)
    }

    async fn save_with_comment(&self, ticket: &Ticket, comment: &TicketComment) -> RepoResult<u64> {
        self.write(ticket, Some(comment))
    }

    async fn update_sla_flags(&self, id: &TicketId, expected_version: u64, flags: SlaFlags) -> RepoResult<bool> {
        let Some(mut stored) = self.tickets.get_mut(id) else { return Ok(false) };
        if stored.version() != expected_version {
            return Ok(false);
        }
        stored.store_sla_flags(flags);
        stored.mark_persisted(expected_version + 1);
        Ok(true)
    }

    async fn delete(&self, scope: TenantScope, id: &TicketId) -> RepoResult<bool> {
        let removed = self.tickets.remove_if(id, |_, t| scope.admits(t)).is_some();
        if removed {
            self.comments.remove(id);
            self.logs.remove(id);
        }
        Ok(removed)
    }

    async fn sweep_candidates(&self, ctx: &SystemContext) -> RepoResult<Vec<Ticket>> {
        let scope = TenantScope::without_tenant_scope(ctx);
        Ok(self
            .tickets
            .iter()
            .filter(|t| scope.admits(t.value()) && t.status().is_active())
            .map(|t| t.value().clone())
            .collect())
    }

    async fn comments(&self, scope: TenantScope, id: &TicketId) -> RepoResult<Vec<TicketComment>> {
        Ok(self
            .comments
            .get(id)
            .map(|c| scope.apply(c.iter()).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_log(&self, log: &TicketLog) -> RepoResult<()> {
        self.logs.entry(log.ticket_id).or_default().push(log.clone());
        Ok(())
    }

    async fn logs(&self, id: &TicketId) -> RepoResult<Vec<TicketLog>> {
        Ok(self.logs.get(id).map(|l| l.clone()).unwrap_or_default())
    }
}

/// Employee records
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn insert(&self, employee: &Employee) -> RepoResult<()>;
    async fn find(&self, scope: TenantScope, id: &EmployeeId) -> RepoResult<Option<Employee>>;
    async fn list(&self, scope: TenantScope) -> RepoResult<Vec<Employee>>;
}

#[derive(Default)]
pub struct InMemoryEmployeeDirectory {
    employees: RwLock<HashMap<EmployeeId, Employee>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn insert(&self, employee: &Employee) -> RepoResult<()> {
        if employee.company_id.is_none() {
            return Err(RepositoryError::Conflict(format!("employee {} has no company", employee.id)));
        }
        self.employees.write().insert(employee.id, employee.clone());
        Ok(())
    }

    async fn find(&self, scope: TenantScope, id: &EmployeeId) -> RepoResult<Option<Employee>> {
        Ok(scope.visible(self.employees.read().get(id).cloned()))
    }

    async fn list(&self, scope: TenantScope) -> RepoResult<Vec<Employee>> {
        Ok(scope.apply(self.employees.read().values()).cloned().collect())
    }
}

/// Product Repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> RepoResult<()>;
    async fn find(&self, scope: TenantScope, id: &ProductId) -> RepoResult<Option<Product>>;
    async fn list(&self, scope: TenantScope) -> RepoResult<Vec<Product>>;

    /// Compare-and-set on `product.version()`; returns the new version
    async fn save(&self, product: &Product) -> RepoResult<u64>;
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: DashMap<ProductId, Product>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: &Product) -> RepoResult<()> {
        if product.company_id().is_none() {
            return Err(RepositoryError::Conflict(format!("product {} has no company", product.id())));
        }
        self.products.insert(*product.id(), product.clone());
        Ok(())
    }

    async fn find(&self, scope: TenantScope, id: &ProductId) -> RepoResult<Option<Product>> {
        Ok(scope.visible(self.products.get(id).map(|p| p.clone())))
    }

    async fn list(&self, scope: TenantScope) -> RepoResult<Vec<Product>> {
        Ok(self
            .products
            .iter()
            .filter(|p| scope.admits(p.value()))
            .map(|p| p.value().clone())
            .collect())
    }

    async fn save(&self, product: &Product) -> RepoResult<u64> {
        let mut stored = self
            .products
            .get_mut(product.id())
            .ok_or_else(|| RepositoryError::NotFound(product.id().to_string()))?;
        if stored.version() != product.version() {
            return Err(RepositoryError::Conflict(format!(
                "product {} is at version {}, write based on {}",
                product.id(),
                stored.version(),
                product.version()
            )));
        }
        let next = product.version() + 1;
        let mut row = product.clone();
        row.take_events();
        row.mark_persisted(next);
        *stored = row;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTicket, SlaDeadlines};
    use chrono::Duration;
    use itdesk_common::CompanyId;

    fn ticket(company: CompanyId) -> Ticket {
        let now = Utc::now();
        let mut draft = NewTicket::new("Monitor flicker", "");
        draft.company_id = Some(company);
        let deadlines = SlaDeadlines { first_response: now + Duration::hours(8), resolution: now + Duration::hours(48) };
        Ticket::open(draft, UserId::new(), deadlines, now).unwrap()
    }

    #[test]
    fn test_scoped_find_hides_other_tenants() {
        let repo = InMemoryTicketRepository::new();
        let a = CompanyId::new();
        let t = ticket(a);
        tokio_test::block_on(async {
            repo.insert(&t).await.unwrap();

            assert!(repo.find(TenantScope::for_company(a), t.id()).await.unwrap().is_some());
            assert!(repo.find(TenantScope::for_company(CompanyId::new()), t.id()).await.unwrap().is_none());
            assert!(!repo.delete(TenantScope::for_company(CompanyId::new()), t.id()).await.unwrap());
        });
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_save_is_compare_and_set() {
        let repo = InMemoryTicketRepository::new();
        let mut t = ticket(CompanyId::new());
        repo.insert(&t).await.unwrap();
        let stale = t.clone();

        let v = repo.save(&t).await.unwrap();
        t.mark_persisted(v);
        assert_eq!(v, 1);
        assert!(matches!(repo.save(&stale).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_comment_is_stored_only_with_its_ticket_write() {
        let repo = InMemoryTicketRepository::new();
        let company = CompanyId::new();
        let mut t = ticket(company);
        repo.insert(&t).await.unwrap();
        let stale = t.clone();

        let first = t.add_comment(UserId::new(), "on it", false, Utc::now()).unwrap();
        let v = repo.save_with_comment(&t, &first).await.unwrap();
        t.mark_persisted(v);

        let mut late = stale.clone();
        let second = late.add_comment(UserId::new(), "me too", false, Utc::now()).unwrap();
        assert!(matches!(repo.save_with_comment(&late, &second).await, Err(RepositoryError::Conflict(_))));

        let stored = repo.comments(TenantScope::for_company(company), t.id()).await.unwrap();
        assert_eq!(stored, vec![first]);
    }

    #[tokio::test]
    async fn test_product_save_is_compare_and_set() {
        let repo = InMemoryProductRepository::new();
        let mut p = Product::new("Dock", 5, 1, Utc::now());
        itdesk_tenant::TenantStamp::assign_company(&mut p, CompanyId::new());
        repo.insert(&p).await.unwrap();

        let mut a = p.clone();
        let mut b = p.clone();
        a.adjust_stock(-1, UserId::new(), Utc::now()).unwrap();
        b.adjust_stock(-2, UserId::new(), Utc::now()).unwrap();

        assert_eq!(repo.save(&a).await.unwrap(), 1);
        assert!(matches!(repo.save(&b).await, Err(RepositoryError::Conflict(_))));
        let stored = repo.find(TenantScope::Unscoped, p.id()).await.unwrap().unwrap();
        assert_eq!((stored.quantity(), stored.version()), (4, 1));
    }

    #[tokio::test]
    async fn test_sla_flag_write_needs_expected_version() {
        let repo = InMemoryTicketRepository::new();
        let t = ticket(CompanyId::new());
        repo.insert(&t).await.unwrap();
        let flags = SlaFlags { first_response: true, resolution: false };

        assert!(!repo.update_sla_flags(t.id(), 7, flags).await.unwrap());
        assert!(repo.update_sla_flags(t.id(), 0, flags).await.unwrap());

        let stored = repo.find(TenantScope::Unscoped, t.id()).await.unwrap().unwrap();
        assert!(stored.sla_violated());
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_filter() {
        let repo = InMemoryTicketRepository::new();
        let company = CompanyId::new();
        let t = ticket(company);
        repo.insert(&t).await.unwrap();
        let scope = TenantScope::for_company(company);

        let open = TicketFilter { status: Some(TicketStatus::Open), ..Default::default() };
        assert_eq!(repo.list(scope, &open).await.unwrap().len(), 1);
        let violated = TicketFilter { sla_violated: Some(true), ..Default::default() };
        assert!(repo.list(scope, &violated).await.unwrap().is_empty());
    }
}
