//! Access Policy Evaluator
//!
//! One ordered rule table per action. Rules are tried top to bottom; the
//! first rule whose role guard and condition both match decides. Nothing
//! matching means deny.

use itdesk_common::{CompanyId, UserId};
use itdesk_tenant::{Role, User};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{EmployeeLink, Ticket, TicketStatus};

/// Ticket actions subject to authorization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action { View, Create, Update, Delete, Assign, ChangeStatus, Close }

impl Action {
    pub const ALL: [Action; 7] = [
        Action::View, Action::Create, Action::Update, Action::Delete,
        Action::Assign, Action::ChangeStatus, Action::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view", Self::Create => "create", Self::Update => "update",
            Self::Delete => "delete", Self::Assign => "assign",
            Self::ChangeStatus => "change_status", Self::Close => "close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// What the policy needs to know about a ticket
#[derive(Clone, Debug)]
pub struct TicketFacts {
    pub company_id: CompanyId,
    pub opened_by: UserId,
    pub assigned_to: Option<UserId>,
    pub status: TicketStatus,
    pub employee: Option<EmployeeLink>,
}

impl TicketFacts {
    pub fn of(ticket: &Ticket, employee: Option<EmployeeLink>) -> Self {
        Self {
            company_id: ticket.company(),
            opened_by: ticket.opened_by(),
            assigned_to: ticket.assigned_to(),
            status: ticket.status(),
            employee,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    ActorWithoutCompany,
    OtherCompany,
    TicketClosed,
    IsOpener,
    IsAssignee,
    IsAssigneeOrOpener,
    IsLinkedEmployee,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect { Permit, Deny }

#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub name: &'static str,
    /// `None` matches any role
    pub roles: Option<&'static [Role]>,
    pub when: Condition,
    pub effect: Effect,
}

const fn rule(name: &'static str, roles: Option<&'static [Role]>, when: Condition, effect: Effect) -> Rule {
    Rule { name, roles, when, effect }
}

const SUPERVISORS: &[Role] = &[Role::Admin, Role::Manager];
const STAFF: &[Role] = &[Role::Technician, Role::Admin, Role::Manager];
const TECHNICIANS: &[Role] = &[Role::Technician];
const VIEWERS: &[Role] = &[Role::Viewer];

const NO_COMPANY: Rule = rule("no-company", None, Condition::ActorWithoutCompany, Effect::Deny);
const OTHER_COMPANY: Rule = rule("other-company", None, Condition::OtherCompany, Effect::Deny);
const CLOSED: Rule = rule("ticket-closed", None, Condition::TicketClosed, Effect::Deny);
const SUPERVISOR: Rule = rule("supervisor", Some(SUPERVISORS), Condition::Always, Effect::Permit);

const VIEW_RULES: &[Rule] = &[
    NO_COMPANY,
    OTHER_COMPANY,
    SUPERVISOR,
    rule("technician-involved", Some(TECHNICIANS), Condition::IsAssigneeOrOpener, Effect::Permit),
    rule("viewer-opener", Some(VIEWERS), Condition::IsOpener, Effect::Permit),
];

const CREATE_RULES: &[Rule] = &[
    NO_COMPANY,
    rule("company-member", None, Condition::Always, Effect::Permit),
];

const UPDATE_RULES: &[Rule] = &[
    NO_COMPANY,
    OTHER_COMPANY,
    CLOSED,
    SUPERVISOR,
    rule("opener", None, Condition::IsOpener, Effect::Permit),
    rule("technician-assignee", Some(TECHNICIANS), Condition::IsAssignee, Effect::Permit),
    rule("viewer-opener", Some(VIEWERS), Condition::IsOpener, Effect::Permit),
];

const SUPERVISOR_ONLY_RULES: &[Rule] = &[NO_COMPANY, OTHER_COMPANY, SUPERVISOR];

const CHANGE_STATUS_RULES: &[Rule] = &[
    NO_COMPANY,
    OTHER_COMPANY,
    CLOSED,
    SUPERVISOR,
    rule("staff-assignee", Some(STAFF), Condition::IsAssignee, Effect::Permit),
    rule("staff-linked-employee", Some(STAFF), Condition::IsLinkedEmployee, Effect::Permit),
];

/// Rule table for `action`
pub fn rules_for(action: Action) -> &'static [Rule] {
    match action {
        Action::View => VIEW_RULES,
        Action::Create => CREATE_RULES,
        Action::Update => UPDATE_RULES,
        Action::Delete | Action::Assign | Action::Close => SUPERVISOR_ONLY_RULES,
        Action::ChangeStatus => CHANGE_STATUS_RULES,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub effect: Effect,
    /// Rule that decided, `default-deny` when none matched
    pub rule: &'static str,
}

impl Decision {
    pub fn is_permitted(&self) -> bool { self.effect == Effect::Permit }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Also treat an unlinked employee whose email equals the actor's as linked
    #[serde(default)]
    pub allow_employee_email_link: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    config: AccessConfig,
}

impl AccessPolicy {
    pub fn new(config: AccessConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, actor: &User, action: Action, ticket: &TicketFacts) -> Decision {
        self.decide(actor, action, Some(ticket))
    }

    pub fn evaluate_create(&self, actor: &User) -> Decision {
        self.decide(actor, Action::Create, None)
    }

    fn decide(&self, actor: &User, action: Action, ticket: Option<&TicketFacts>) -> Decision {
        let decision = rules_for(action)
            .iter()
            .find(|r| r.roles.map_or(true, |roles| actor.has_any_role(roles)) && self.matches(r.when, actor, ticket))
            .map(|r| Decision { effect: r.effect, rule: r.name })
            .unwrap_or(Decision { effect: Effect::Deny, rule: "default-deny" });

        tracing::debug!(
            user_id = %actor.id,
            action = action.as_str(),
            rule = decision.rule,
            effect = ?decision.effect,
            "access decision"
        );
        decision
    }

    /// Conditions about the ticket never match when there is no ticket
    fn matches(&self, when: Condition, actor: &User, ticket: Option<&TicketFacts>) -> bool {
        match (when, ticket) {
            (Condition::Always, _) => true,
            (Condition::ActorWithoutCompany, _) => actor.company_id.is_none(),
            (_, None) => false,
            (Condition::OtherCompany, Some(t)) => actor.company_id != Some(t.company_id),
            (Condition::TicketClosed, Some(t)) => t.status == TicketStatus::Closed,
            (Condition::IsOpener, Some(t)) => t.opened_by == actor.id,
            (Condition::IsAssignee, Some(t)) => t.assigned_to == Some(actor.id),
            (Condition::IsAssigneeOrOpener, Some(t)) => t.assigned_to == Some(actor.id) || t.opened_by == actor.id,
            (Condition::IsLinkedEmployee, Some(t)) => t.employee.as_ref().is_some_and(|e| self.is_linked(actor, e)),
        }
    }

    fn is_linked(&self, actor: &User, employee: &EmployeeLink) -> bool {
        match employee.user_id {
            Some(user_id) => user_id == actor.id,
            None => {
                self.config.allow_employee_email_link
                    && !employee.email.is_empty()
                    && employee.email.eq_ignore_ascii_case(&actor.email)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        company: CompanyId,
        admin: User,
        tech: User,
        viewer: User,
    }

    fn fixture() -> Fixture {
        let company = CompanyId::new();
        Fixture {
            company,
            admin: User::new(Some(company), "Ada", "ada@acme.test", &[Role::Admin]),
            tech: User::new(Some(company), "Tom", "tom@acme.test", &[Role::Technician]),
            viewer: User::new(Some(company), "Vi", "vi@acme.test", &[Role::Viewer]),
        }
    }

    fn facts(company: CompanyId, opener: &User) -> TicketFacts {
        TicketFacts {
            company_id: company,
            opened_by: opener.id,
            assigned_to: None,
            status: TicketStatus::Open,
            employee: None,
        }
    }

    #[test]
    fn test_viewer_sees_only_own_tickets() {
        let f = fixture();
        let policy = AccessPolicy::default();
        let own = facts(f.company, &f.viewer);
        let other = facts(f.company, &f.admin);

        assert!(policy.evaluate(&f.viewer, Action::View, &own).is_permitted());
        let denied = policy.evaluate(&f.viewer, Action::View, &other);
        assert_eq!(denied, Decision { effect: Effect::Deny, rule: "default-deny" });
    }

    #[test]
    fn test_admin_cannot_view_other_company() {
        let f = fixture();
        let foreign = facts(CompanyId::new(), &f.admin);
        let d = AccessPolicy::default().evaluate(&f.admin, Action::View, &foreign);
        assert_eq!(d.rule, "other-company");
        assert!(!d.is_permitted());
    }

    #[test]
    fn test_technician_assignee_changes_status() {
        let f = fixture();
        let policy = AccessPolicy::default();
        let mut t = facts(f.company, &f.viewer);
        assert!(!policy.evaluate(&f.tech, Action::ChangeStatus, &t).is_permitted());

        t.assigned_to = Some(f.tech.id);
        assert_eq!(policy.evaluate(&f.tech, Action::ChangeStatus, &t).rule, "staff-assignee");
        assert!(!policy.evaluate(&f.tech, Action::Close, &t).is_permitted());
    }

    #[test]
    fn test_closed_ticket_blocks_update_even_for_admin() {
        let f = fixture();
        let mut t = facts(f.company, &f.admin);
        t.status = TicketStatus::Closed;
        let d = AccessPolicy::default().evaluate(&f.admin, Action::Update, &t);
        assert_eq!(d, Decision { effect: Effect::Deny, rule: "ticket-closed" });
    }

    #[test]
    fn test_manager_cannot_assign_other_company_ticket() {
        let f = fixture();
        let manager = User::new(Some(f.company), "Max", "max@acme.test", &[Role::Manager]);
        let foreign = facts(CompanyId::new(), &f.admin);
        let d = AccessPolicy::default().evaluate(&manager, Action::Assign, &foreign);
        assert_eq!(d, Decision { effect: Effect::Deny, rule: "other-company" });
    }

    #[test]
    fn test_closed_ticket_blocks_assigned_technician() {
        let f = fixture();
        let mut t = facts(f.company, &f.viewer);
        t.assigned_to = Some(f.tech.id);
        t.status = TicketStatus::Closed;
        let d = AccessPolicy::default().evaluate(&f.tech, Action::ChangeStatus, &t);
        assert_eq!(d, Decision { effect: Effect::Deny, rule: "ticket-closed" });
    }

    #[test]
    fn test_create_requires_company() {
        let f = fixture();
        let policy = AccessPolicy::default();
        assert!(policy.evaluate_create(&f.viewer).is_permitted());

        let onboarding = User::new(None, "New", "new@x.test", &[Role::Admin]);
        assert_eq!(policy.evaluate_create(&onboarding).rule, "no-company");
    }

    #[test]
    fn test_multi_role_matches_any() {
        let f = fixture();
        let both = User::new(Some(f.company), "Mo", "mo@acme.test", &[Role::Viewer, Role::Manager]);
        let t = facts(f.company, &f.admin);
        assert!(AccessPolicy::default().evaluate(&both, Action::Assign, &t).is_permitted());
    }

    #[test]
    fn test_linked_employee() {
        let f = fixture();
        let mut t = facts(f.company, &f.viewer);
        t.employee = Some(EmployeeLink { user_id: None, email: "TOM@acme.test".into() });

        let strict = AccessPolicy::default();
        assert!(!strict.evaluate(&f.tech, Action::ChangeStatus, &t).is_permitted());

        let lenient = AccessPolicy::new(AccessConfig { allow_employee_email_link: true });
        assert_eq!(lenient.evaluate(&f.tech, Action::ChangeStatus, &t).rule, "staff-linked-employee");

        t.employee = Some(EmployeeLink { user_id: Some(f.tech.id), email: "someone@else.test".into() });
        assert!(strict.evaluate(&f.tech, Action::ChangeStatus, &t).is_permitted());

        // a viewer is never promoted by the link
        t.employee = Some(EmployeeLink { user_id: Some(f.viewer.id), email: String::new() });
        t.opened_by = f.admin.id;
        assert!(!strict.evaluate(&f.viewer, Action::ChangeStatus, &t).is_permitted());
    }

    #[test]
    fn test_delete_is_supervisor_only() {
        let f = fixture();
        let t = facts(f.company, &f.tech);
        let policy = AccessPolicy::default();
        assert!(!policy.evaluate(&f.tech, Action::Delete, &t).is_permitted());
        assert!(policy.evaluate(&f.admin, Action::Delete, &t).is_permitted());
    }
}
