//! Ticket Service
//!
//! Every mutation runs the same pipeline:
//! scope lookup → company writable → access check → business rules →
//! persist (with audit log) → notify.

use std::sync::Arc;

use itdesk_common::{CompanyId, EmployeeId, ProductId, RepositoryError, SharedClock, TicketId, UserId};
use itdesk_tenant::{
    CompanyRegistry, QuotaEnforcer, QuotaResult, Resource, Role, TenantScope, User, UserDirectory,
};

use crate::access::{AccessConfig, AccessPolicy, Action, TicketFacts};
use crate::domain::{
    Employee, LogAction, NewTicket, SupportEvent, Ticket, TicketChanges, TicketComment, TicketLog, TicketStatus,
};
use crate::notify::{NotificationDispatcher, Notifier};
use crate::repository::{EmployeeDirectory, ProductRepository, TicketFilter, TicketRepository};
use crate::sla::{SlaChange, SlaEvaluator, SlaPolicy, SlaStatus};
use crate::sweep::SlaSweeper;
use crate::usage::UsageReporter;
use crate::{quota_exceeded, SupportError, SupportResult};

const STAFF: &[Role] = &[Role::Admin, Role::Manager, Role::Technician];
const SUPERVISORS: &[Role] = &[Role::Admin, Role::Manager];

/// Collaborators shared by the support services
#[derive(Clone)]
pub struct SupportDeps {
    pub tickets: Arc<dyn TicketRepository>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub companies: Arc<CompanyRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: SharedClock,
}

impl SupportDeps {
    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.notifier.clone(), self.users.clone())
    }

    pub fn usage(&self) -> UsageReporter {
        UsageReporter::new(
            self.tickets.clone(),
            self.products.clone(),
            self.users.clone(),
            self.companies.clone(),
            self.clock.clone(),
        )
    }

    pub fn sweeper(&self, evaluator: SlaEvaluator) -> SlaSweeper {
        SlaSweeper::new(self.tickets.clone(), evaluator, self.dispatcher(), self.clock.clone())
    }
}

#[derive(Clone)]
pub struct TicketService {
    deps: SupportDeps,
    evaluator: SlaEvaluator,
    policy: AccessPolicy,
    dispatcher: NotificationDispatcher,
    usage: UsageReporter,
}

impl TicketService {
    pub fn new(deps: SupportDeps, sla: Arc<dyn SlaPolicy>, access: AccessConfig) -> Self {
        Self {
            evaluator: SlaEvaluator::new(sla),
            policy: AccessPolicy::new(access),
            dispatcher: deps.dispatcher(),
            usage: deps.usage(),
            deps,
        }
    }

    pub fn evaluator(&self) -> &SlaEvaluator {
        &self.evaluator
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn get_ticket(&self, actor: &User, id: &TicketId) -> SupportResult<Ticket> {
        let ticket = self.load(actor, id).await?;
        self.authorize(actor, Action::View, &ticket).await?;
        Ok(ticket)
    }

    /// Tickets of the actor's company the actor may view
    pub async fn list_tickets(&self, actor: &User, filter: &TicketFilter) -> SupportResult<Vec<Ticket>> {
        let Some(company) = actor.company_id else { return Ok(vec![]) };
        let rows = self.deps.tickets.list(TenantScope::for_company(company), filter).await?;
        Ok(rows
            .into_iter()
            .filter(|t| self.policy.evaluate(actor, Action::View, &TicketFacts::of(t, None)).is_permitted())
            .collect())
    }

    /// Comments visible to the actor; internal notes are staff-only
    pub async fn comments(&self, actor: &User, id: &TicketId) -> SupportResult<Vec<TicketComment>> {
        let ticket = self.get_ticket(actor, id).await?;
        let staff = actor.has_any_role(STAFF);
        let scope = TenantScope::for_company(ticket.company());
        Ok(self
            .deps
            .tickets
            .comments(scope, id)
            .await?
            .into_iter()
            .filter(|c| staff || !c.internal)
            .collect())
    }

    pub async fn logs(&self, actor: &User, id: &TicketId) -> SupportResult<Vec<TicketLog>> {
        self.get_ticket(actor, id).await?;
        Ok(self.deps.tickets.logs(id).await?)
    }

    /// On-demand SLA report; nothing is persisted
    pub async fn sla_status(&self, actor: &User, id: &TicketId) -> SupportResult<SlaStatus> {
        let ticket = self.get_ticket(actor, id).await?;
        Ok(self.evaluator.evaluate(&ticket, self.deps.clock.now())?)
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    pub async fn create_ticket(&self, actor: &User, draft: NewTicket) -> SupportResult<Ticket> {
        let decision = self.policy.evaluate_create(actor);
        if !decision.is_permitted() {
            return Err(SupportError::denied(Action::Create, decision));
        }
        let company_id = actor.company_id.ok_or_else(|| SupportError::NotFound("company".into()))?;
        let scope = TenantScope::for_company(company_id);

        let mut draft = draft;
        scope.stamp(&mut draft)?;
        let company = self.deps.companies.writable(&company_id)?;

        let usage = self.usage.usage(company_id).await?;
        if let QuotaResult::Exceeded { resource, limit } =
            QuotaEnforcer::check(&company.limits, &usage, Resource::TicketsPerMonth)
        {
            return Err(quota_exceeded(resource, limit));
        }

        if let Some(assignee) = draft.assigned_to {
            let facts = TicketFacts {
                company_id,
                opened_by: actor.id,
                assigned_to: None,
                status: TicketStatus::Open,
                employee: None,
            };
            let decision = self.policy.evaluate(actor, Action::Assign, &facts);
            if !decision.is_permitted() {
                return Err(SupportError::denied(Action::Assign, decision));
            }
            self.ensure_member(company_id, assignee).await?;
        }
        self.ensure_references(scope, draft.product_id, draft.employee_id).await?;

        let now = self.deps.clock.now();
        let deadlines = self.evaluator.deadlines(draft.priority, now);
        let mut ticket = Ticket::open(draft, actor.id, deadlines, now)?;
        let events = ticket.take_events();
        self.deps.tickets.insert(&ticket).await?;
        self.log(&ticket, Some(actor.id), LogAction::Created, format!("opened with {} priority", ticket.priority()))
            .await;

        tracing::info!(
            ticket_id = %ticket.id(),
            company_id = %company_id,
            priority = %ticket.priority(),
            "ticket created"
        );
        self.dispatcher.dispatch_all(&events).await;
        Ok(ticket)
    }

    pub async fn update_ticket(&self, actor: &User, id: &TicketId, changes: TicketChanges) -> SupportResult<Ticket> {
        let mut ticket = self.load_for(actor, id, Action::Update).await?;
        let scope = TenantScope::for_company(ticket.company());
        self.ensure_references(scope, changes.product_id, changes.employee_id).await?;

        let deadlines = changes
            .priority
            .filter(|p| *p != ticket.priority())
            .map(|p| self.evaluator.deadlines(p, ticket.created_at()));
        let changed = ticket.update(changes, deadlines, self.deps.clock.now())?;
        if changed.is_empty() {
            return Ok(ticket);
        }
        let entry = self.entry(&ticket, actor, LogAction::Updated, format!("changed {}", changed.join(", ")));
        self.commit(ticket, vec![entry]).await
    }

    pub async fn assign_ticket(&self, actor: &User, id: &TicketId, assignee: UserId) -> SupportResult<Ticket> {
        let mut ticket = self.load_for(actor, id, Action::Assign).await?;
        self.ensure_member(ticket.company(), assignee).await?;
        ticket.assign(assignee, actor.id, self.deps.clock.now())?;
        let entry = self.entry(&ticket, actor, LogAction::Assigned, format!("assigned to {}", assignee));
        self.commit(ticket, vec![entry]).await
    }

    pub async fn change_status(
        &self,
        actor: &User,
        id: &TicketId,
        to: TicketStatus,
        resolution: Option<String>,
    ) -> SupportResult<Ticket> {
        let mut ticket = self.load_for(actor, id, Action::ChangeStatus).await?;
        if to == TicketStatus::Closed {
            self.authorize(actor, Action::Close, &ticket).await?;
        }
        let from = ticket.change_status(to, resolution, actor.id, self.deps.clock.now())?;
        let entry = self.entry(&ticket, actor, LogAction::StatusChanged, format!("{} -> {}", from, to));
        self.commit(ticket, vec![entry]).await
    }

    pub async fn close_ticket(&self, actor: &User, id: &TicketId, resolution: Option<String>) -> SupportResult<Ticket> {
        let mut ticket = self.load_for(actor, id, Action::Close).await?;
        let from = ticket.close(resolution, actor.id, self.deps.clock.now())?;
        let entry = self.entry(&ticket, actor, LogAction::StatusChanged, format!("{} -> closed", from));
        self.commit(ticket, vec![entry]).await
    }

    pub async fn add_comment(
        &self,
        actor: &User,
        id: &TicketId,
        body: &str,
        internal: bool,
    ) -> SupportResult<TicketComment> {
        let mut ticket = self.load_for(actor, id, Action::View).await?;
        if internal && !actor.has_any_role(STAFF) {
            return Err(SupportError::Forbidden { action: "comment", rule: "internal-notes-staff-only" });
        }
        let comment = ticket.add_comment(actor.id, body, internal, self.deps.clock.now())?;
        let kind = if internal { "internal note" } else { "comment" };
        let entry = self.entry(&ticket, actor, LogAction::Commented, format!("added {}", kind));
        let ticket = self.persist(ticket, vec![entry], Some(&comment)).await?;
        tracing::debug!(ticket_id = %ticket.id(), comment_id = %comment.id, internal, "comment added");
        Ok(comment)
    }

    pub async fn delete_ticket(&self, actor: &User, id: &TicketId) -> SupportResult<()> {
        let ticket = self.load_for(actor, id, Action::Delete).await?;
        let scope = TenantScope::for_company(ticket.company());
        if !self.deps.tickets.delete(scope, id).await? {
            return Err(SupportError::NotFound(id.to_string()));
        }
        tracing::info!(ticket_id = %id, user_id = %actor.id, "ticket deleted");
        Ok(())
    }

    /// Add a staff record to the actor's company
    pub async fn register_employee(&self, actor: &User, employee: Employee) -> SupportResult<Employee> {
        let company_id = actor.company_id.ok_or_else(|| SupportError::NotFound("company".into()))?;
        if !actor.has_any_role(SUPERVISORS) {
            return Err(SupportError::Forbidden { action: "register_employee", rule: "supervisor" });
        }
        self.deps.companies.writable(&company_id)?;
        let mut employee = employee;
        TenantScope::for_company(company_id).stamp(&mut employee)?;
        if let Some(user_id) = employee.user_id {
            self.ensure_member(company_id, user_id).await?;
        }
        self.deps.employees.insert(&employee).await?;
        Ok(employee)
    }

    // -------------------------------------------------------------------------
    // Pipeline steps
    // -------------------------------------------------------------------------

    /// Tenant-scoped lookup. A company-less actor sees nothing.
    async fn load(&self, actor: &User, id: &TicketId) -> SupportResult<Ticket> {
        let company = actor.company_id.ok_or_else(|| SupportError::NotFound(id.to_string()))?;
        self.deps
            .tickets
            .find(TenantScope::for_company(company), id)
            .await?
            .ok_or_else(|| SupportError::NotFound(id.to_string()))
    }

    /// Load for a mutation: scope, writable company, access, then bring the
    /// SLA flags up to date so a late transition still records the breach
    async fn load_for(&self, actor: &User, id: &TicketId, action: Action) -> SupportResult<Ticket> {
        let mut ticket = self.load(actor, id).await?;
        self.deps.companies.writable(&ticket.company())?;
        self.authorize(actor, action, &ticket).await?;
        self.refresh_sla(&mut ticket);
        Ok(ticket)
    }

    async fn authorize(&self, actor: &User, action: Action, ticket: &Ticket) -> SupportResult<()> {
        let employee = match (action, ticket.employee_id()) {
            (Action::ChangeStatus, Some(eid)) => self
                .deps
                .employees
                .find(TenantScope::for_company(ticket.company()), &eid)
                .await?
                .map(|e| e.link()),
            _ => None,
        };
        let decision = self.policy.evaluate(actor, action, &TicketFacts::of(ticket, employee));
        if decision.is_permitted() {
            Ok(())
        } else {
            tracing::info!(
                ticket_id = %ticket.id(),
                user_id = %actor.id,
                action = action.as_str(),
                rule = decision.rule,
                "access denied"
            );
            Err(SupportError::denied(action, decision))
        }
    }

    fn refresh_sla(&self, ticket: &mut Ticket) -> Option<SlaChange> {
        match self.evaluator.reconcile(ticket, self.deps.clock.now()) {
            Ok(change) => Some(change),
            Err(e) => {
                tracing::warn!(ticket_id = %ticket.id(), error = %e, "SLA evaluation skipped");
                None
            }
        }
    }

    async fn commit(&self, ticket: Ticket, logs: Vec<TicketLog>) -> SupportResult<Ticket> {
        self.persist(ticket, logs, None).await
    }

    /// Re-evaluate SLA, compare-and-set the row (with `comment` if given),
    /// append logs, fan out events
    async fn persist(
        &self,
        mut ticket: Ticket,
        mut logs: Vec<TicketLog>,
        comment: Option<&TicketComment>,
    ) -> SupportResult<Ticket> {
        let change = self.refresh_sla(&mut ticket).unwrap_or_default();
        let written = match comment {
            Some(c) => self.deps.tickets.save_with_comment(&ticket, c).await,
            None => self.deps.tickets.save(&ticket).await,
        };
        let version = written.map_err(|e| match e {
            RepositoryError::Conflict(technical) => SupportError::business(
                technical,
                "This ticket was modified by someone else. Reload it and try again.",
            ),
            other => SupportError::Repository(other),
        })?;
        ticket.mark_persisted(version);

        let events = ticket.take_events();
        let now = self.deps.clock.now();
        logs.extend(events.iter().filter_map(|e| match e {
            SupportEvent::SlaViolated { kind, .. } => Some(TicketLog::new(
                *ticket.id(),
                None,
                LogAction::SlaViolated,
                format!("{} deadline passed", kind),
                now,
            )),
            _ => None,
        }));
        logs.extend(change.cleared_dimensions().into_iter().map(|kind| {
            TicketLog::new(*ticket.id(), None, LogAction::SlaCleared, format!("{} violation cleared", kind), now)
        }));
        for entry in &logs {
            self.append_log(entry).await;
        }
        self.dispatcher.dispatch_all(&events).await;
        Ok(ticket)
    }

    fn entry(&self, ticket: &Ticket, actor: &User, action: LogAction, detail: String) -> TicketLog {
        TicketLog::new(*ticket.id(), Some(actor.id), action, detail, self.deps.clock.now())
    }

    async fn log(&self, ticket: &Ticket, actor: Option<UserId>, action: LogAction, detail: String) {
        let entry = TicketLog::new(*ticket.id(), actor, action, detail, self.deps.clock.now());
        self.append_log(&entry).await;
    }

    async fn append_log(&self, entry: &TicketLog) {
        if let Err(e) = self.deps.tickets.append_log(entry).await {
            tracing::warn!(ticket_id = %entry.ticket_id, error = %e, "ticket log append failed");
        }
    }

    async fn ensure_member(&self, company_id: CompanyId, user_id: UserId) -> SupportResult<()> {
        match self.deps.users.get(&user_id).await? {
            Some(user) if user.belongs_to(company_id) => Ok(()),
            _ => Err(SupportError::business(
                format!("user {} is not a member of company {}", user_id, company_id),
                "That person is not a member of your company.",
            )),
        }
    }

    async fn ensure_references(
        &self,
        scope: TenantScope,
        product: Option<ProductId>,
        employee: Option<EmployeeId>,
    ) -> SupportResult<()> {
        if let Some(pid) = product {
            if self.deps.products.find(scope, &pid).await?.is_none() {
                return Err(SupportError::business(format!("product {} not in scope", pid), "Unknown product."));
            }
        }
        if let Some(eid) = employee {
            if self.deps.employees.find(scope, &eid).await?.is_none() {
                return Err(SupportError::business(format!("employee {} not in scope", eid), "Unknown employee."));
            }
        }
        Ok(())
    }
}
