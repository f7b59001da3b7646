//! Tenant Data Model

use chrono::{DateTime, Utc};
use itdesk_common::{CompanyId, DomainError, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Company (tenant) definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    /// Unique company ID
    pub id: CompanyId,
    /// Display name
    pub name: String,
    /// Subscription plan
    pub plan: PlanTier,
    /// Plan limits
    pub limits: PlanLimits,
    /// Inactive companies cannot mutate anything
    pub active: bool,
    /// Suspended companies cannot mutate anything
    pub suspended: bool,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Create new active company on `plan`
    pub fn new(name: &str, plan: PlanTier, now: DateTime<Utc>) -> Self {
        Self {
            id: CompanyId::new(),
            name: name.to_string(),
            plan,
            limits: PlanLimits::for_tier(plan),
            active: true,
            suspended: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether members may run mutating operations
    pub fn is_writable(&self) -> bool {
        self.active && !self.suspended
    }
}

/// Subscription plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
    Enterprise,
}

/// Plan limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanLimits {
    /// Max user accounts
    pub max_users: Option<u32>,
    /// Max inventory products
    pub max_products: Option<u32>,
    /// Max tickets opened per calendar month (UTC)
    pub max_tickets_per_month: Option<u32>,
}

impl PlanLimits {
    /// Get limits for tier
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                max_users: Some(3),
                max_products: Some(50),
                max_tickets_per_month: Some(30),
            },
            PlanTier::Pro => Self {
                max_users: Some(25),
                max_products: Some(1_000),
                max_tickets_per_month: Some(500),
            },
            PlanTier::Enterprise => Self {
                max_users: None,
                max_products: None,
                max_tickets_per_month: None,
            },
        }
    }
}

/// User role. Closed set: every policy matches on it exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full control inside the company
    #[serde(rename = "admin")]
    Admin,
    /// Manager ("gestor")
    #[serde(rename = "gestor")]
    Manager,
    /// Technician ("tecnico")
    #[serde(rename = "tecnico")]
    Technician,
    /// Read-mostly member
    #[serde(rename = "viewer")]
    Viewer,
}

impl Role {
    /// Every role, in privilege order
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Technician, Role::Viewer];

    /// Stable wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "gestor",
            Role::Technician => "tecnico",
            Role::Viewer => "viewer",
        }
    }

    /// Admins and managers supervise the whole company
    pub fn is_supervisor(&self) -> bool {
        match self {
            Role::Admin | Role::Manager => true,
            Role::Technician | Role::Viewer => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "gestor" | "manager" => Ok(Role::Manager),
            "tecnico" | "technician" => Ok(Role::Technician),
            "viewer" => Ok(Role::Viewer),
            _ => Err(DomainError::UnknownVariant {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// `None` while onboarding
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub is_owner: bool,
}

impl User {
    /// Create a member of `company_id` with the given roles
    pub fn new(company_id: Option<CompanyId>, name: &str, email: &str, roles: &[Role]) -> Self {
        Self {
            id: UserId::new(),
            company_id,
            name: name.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            is_owner: false,
        }
    }

    /// Check a single role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check membership in any of `roles`
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.roles.iter().any(|r| roles.contains(r))
    }

    /// Whether this user belongs to `company_id`
    pub fn belongs_to(&self, company_id: CompanyId) -> bool {
        self.company_id == Some(company_id)
    }
}
