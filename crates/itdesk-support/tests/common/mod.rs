//! Shared in-memory harness for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use itdesk_common::{ManualClock, SharedClock};
use itdesk_support::{
    AccessConfig, InMemoryEmployeeDirectory, InMemoryNotifier, InMemoryProductRepository, InMemoryTicketRepository,
    NewTicket, Priority, SlaEvaluator, SlaSweeper, SlaTable, SupportDeps, Ticket, TicketService,
};
use itdesk_tenant::{Company, CompanyRegistry, InMemoryUserDirectory, PlanTier, Role, User, UserDirectory};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap()
}

pub struct Tenant {
    pub company: Company,
    pub admin: User,
    pub manager: User,
    pub tech: User,
    pub viewer: User,
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub tickets: Arc<InMemoryTicketRepository>,
    pub users: Arc<InMemoryUserDirectory>,
    pub companies: Arc<CompanyRegistry>,
    pub notifier: Arc<InMemoryNotifier>,
    pub deps: SupportDeps,
    pub service: TicketService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_access(AccessConfig::default())
    }

    pub fn with_access(access: AccessConfig) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let companies = Arc::new(CompanyRegistry::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let shared_clock: SharedClock = clock.clone();
        let deps = SupportDeps {
            tickets: tickets.clone(),
            employees: Arc::new(InMemoryEmployeeDirectory::new()),
            products: Arc::new(InMemoryProductRepository::new()),
            users: users.clone(),
            companies: companies.clone(),
            notifier: notifier.clone(),
            clock: shared_clock,
        };
        let service = TicketService::new(deps.clone(), Arc::new(SlaTable::default()), access);
        Self { clock, tickets, users, companies, notifier, deps, service }
    }

    pub fn sweeper(&self) -> SlaSweeper {
        self.deps.sweeper(SlaEvaluator::new(Arc::new(SlaTable::default())))
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        self.tenant_on(name, PlanTier::Enterprise).await
    }

    pub async fn tenant_on(&self, name: &str, plan: PlanTier) -> Tenant {
        let company = self.companies.create(name, plan, t0());
        let member = |n: &str, role: Role| {
            User::new(Some(company.id), n, &format!("{}@{}.test", n.to_lowercase(), name.to_lowercase()), &[role])
        };
        let tenant = Tenant {
            admin: member("Ada", Role::Admin),
            manager: member("Max", Role::Manager),
            tech: member("Tom", Role::Technician),
            viewer: member("Vi", Role::Viewer),
            company,
        };
        for u in [&tenant.admin, &tenant.manager, &tenant.tech, &tenant.viewer] {
            self.users.save(u).await.unwrap();
        }
        tenant
    }

    pub async fn open(&self, actor: &User, title: &str, priority: Priority) -> Ticket {
        let draft = NewTicket::new(title, "reported via portal").with_priority(priority);
        self.service.create_ticket(actor, draft).await.unwrap()
    }
}
