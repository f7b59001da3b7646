//! Company usage statistics
//!
//! Counts are gathered across tenants through the explicit scope bypass and
//! then narrowed to the requested company.

use std::sync::Arc;

use itdesk_common::{CompanyId, SharedClock};
use itdesk_tenant::{month_start, CompanyRegistry, CompanyUsage, SystemContext, TenantOwned, TenantScope, UserDirectory};

use crate::repository::{ProductRepository, TicketFilter, TicketRepository};
use crate::SupportResult;

#[derive(Clone)]
pub struct UsageReporter {
    tickets: Arc<dyn TicketRepository>,
    products: Arc<dyn ProductRepository>,
    users: Arc<dyn UserDirectory>,
    companies: Arc<CompanyRegistry>,
    clock: SharedClock,
}

impl UsageReporter {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserDirectory>,
        companies: Arc<CompanyRegistry>,
        clock: SharedClock,
    ) -> Self {
        Self { tickets, products, users, companies, clock }
    }

    pub async fn usage(&self, company_id: CompanyId) -> SupportResult<CompanyUsage> {
        let ctx = SystemContext::internal("usage statistics");
        let scope = TenantScope::without_tenant_scope(&ctx);
        let ours = |owner: Option<CompanyId>| owner == Some(company_id);

        let tickets = self.tickets.list(scope, &TicketFilter::default()).await?;
        let since = month_start(self.clock.now());
        let products = self.products.list(scope).await?;
        let users = self.users.members(&company_id).await?;

        Ok(CompanyUsage {
            company_id: Some(company_id),
            users: count(users.len()),
            products: count(products.iter().filter(|p| ours(p.company_id())).count()),
            tickets_this_month: count(
                tickets.iter().filter(|t| ours(t.company_id()) && t.created_at() >= since).count(),
            ),
            open_tickets: count(tickets.iter().filter(|t| ours(t.company_id()) && t.status().is_active()).count()),
        })
    }

    /// Usage of every registered company
    pub async fn all(&self) -> SupportResult<Vec<CompanyUsage>> {
        let mut out = vec![];
        for company in self.companies.list() {
            out.push(self.usage(company.id).await?);
        }
        Ok(out)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
