//! Employee records
//!
//! An employee is a person a ticket is about. It may be linked to a user
//! account, which lets that user see the employee's tickets.
use itdesk_common::{CompanyId, EmployeeId, UserId};
use itdesk_tenant::{TenantOwned, TenantStamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    /// Explicit link to a user account
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Employee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: EmployeeId::new(),
            company_id: None,
            name: name.into(),
            email: email.into(),
            department: None,
            user_id: None,
        }
    }

    pub fn linked_to(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// The slice of this record the access policy needs
    pub fn link(&self) -> EmployeeLink {
        EmployeeLink { user_id: self.user_id, email: self.email.clone() }
    }
}

impl TenantOwned for Employee {
    fn company_id(&self) -> Option<CompanyId> { self.company_id }
}

impl TenantStamp for Employee {
    fn assign_company(&mut self, company_id: CompanyId) { self.company_id = Some(company_id); }
}

/// Identity facts used for the "linked employee" rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeLink {
    pub user_id: Option<UserId>,
    pub email: String,
}
