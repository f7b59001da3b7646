//! Company Lifecycle Management

use crate::model::{Company, PlanLimits, PlanTier};
use chrono::{DateTime, Utc};
use itdesk_common::CompanyId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Company registry
#[derive(Default)]
pub struct CompanyRegistry {
    companies: RwLock<HashMap<CompanyId, Company>>,
}

impl CompanyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new company
    pub fn create(&self, name: &str, plan: PlanTier, now: DateTime<Utc>) -> Company {
        let company = Company::new(name, plan, now);
        self.companies.write().insert(company.id, company.clone());
        tracing::info!(company_id = %company.id, ?plan, "company created");
        company
    }

    /// Register an existing company record
    pub fn insert(&self, company: Company) {
        self.companies.write().insert(company.id, company);
    }

    /// Get company
    pub fn get(&self, id: &CompanyId) -> Option<Company> {
        self.companies.read().get(id).cloned()
    }

    /// List all companies
    pub fn list(&self) -> Vec<Company> {
        self.companies.read().values().cloned().collect()
    }

    /// Change plan, resetting limits to the plan defaults
    pub fn change_plan(
        &self,
        id: &CompanyId,
        plan: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<Company, LifecycleError> {
        self.modify(id, now, |c| {
            c.plan = plan;
            c.limits = PlanLimits::for_tier(plan);
        })
    }

    /// Override individual limits
    pub fn set_limits(
        &self,
        id: &CompanyId,
        limits: PlanLimits,
        now: DateTime<Utc>,
    ) -> Result<Company, LifecycleError> {
        self.modify(id, now, |c| c.limits = limits)
    }

    /// Suspend company
    pub fn suspend(&self, id: &CompanyId, now: DateTime<Utc>) -> Result<Company, LifecycleError> {
        tracing::warn!(company_id = %id, "company suspended");
        self.modify(id, now, |c| c.suspended = true)
    }

    /// Lift a suspension
    pub fn reinstate(&self, id: &CompanyId, now: DateTime<Utc>) -> Result<Company, LifecycleError> {
        self.modify(id, now, |c| c.suspended = false)
    }

    /// Deactivate company
    pub fn deactivate(&self, id: &CompanyId, now: DateTime<Utc>) -> Result<Company, LifecycleError> {
        self.modify(id, now, |c| c.active = false)
    }

    /// Activate company
    pub fn activate(&self, id: &CompanyId, now: DateTime<Utc>) -> Result<Company, LifecycleError> {
        self.modify(id, now, |c| c.active = true)
    }

    /// Get a company that accepts mutations
    pub fn writable(&self, id: &CompanyId) -> Result<Company, LifecycleError> {
        let company = self.get(id).ok_or(LifecycleError::NotFound)?;
        if !company.active {
            return Err(LifecycleError::Inactive);
        }
        if company.suspended {
            return Err(LifecycleError::Suspended);
        }
        Ok(company)
    }

    /// Get company count
    pub fn count(&self) -> usize {
        self.companies.read().len()
    }

    fn modify(
        &self,
        id: &CompanyId,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Company),
    ) -> Result<Company, LifecycleError> {
        let mut companies = self.companies.write();
        let company = companies.get_mut(id).ok_or(LifecycleError::NotFound)?;
        f(company);
        company.updated_at = now;
        Ok(company.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("company not found")]
    NotFound,
    #[error("company is suspended")]
    Suspended,
    #[error("company is inactive")]
    Inactive,
}
