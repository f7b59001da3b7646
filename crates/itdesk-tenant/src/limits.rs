//! Plan Limits and Quota Enforcement

use crate::model::PlanLimits;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use itdesk_common::CompanyId;
use serde::{Deserialize, Serialize};

/// Quota-limited resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Products,
    TicketsPerMonth,
}

impl Resource {
    fn limit(&self, limits: &PlanLimits) -> Option<u32> {
        match self {
            Resource::Users => limits.max_users,
            Resource::Products => limits.max_products,
            Resource::TicketsPerMonth => limits.max_tickets_per_month,
        }
    }
}

/// Quota check outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResult {
    Allowed,
    Exceeded { resource: Resource, limit: u32 },
}

impl QuotaResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaResult::Allowed)
    }
}

/// Current consumption of a company, computed by trusted aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyUsage {
    pub company_id: Option<CompanyId>,
    pub users: u32,
    pub products: u32,
    pub tickets_this_month: u32,
    pub open_tickets: u32,
}

impl CompanyUsage {
    fn current(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Users => self.users,
            Resource::Products => self.products,
            Resource::TicketsPerMonth => self.tickets_this_month,
        }
    }
}

/// Quota enforcer
pub struct QuotaEnforcer;

impl QuotaEnforcer {
    /// Can one more `resource` be created given `usage`?
    pub fn check(limits: &PlanLimits, usage: &CompanyUsage, resource: Resource) -> QuotaResult {
        match resource.limit(limits) {
            Some(limit) if usage.current(resource) >= limit => {
                tracing::debug!(?resource, limit, "quota exhausted");
                QuotaResult::Exceeded { resource, limit }
            }
            _ => QuotaResult::Allowed,
        }
    }
}

/// First instant of the UTC calendar month containing `now`
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlanTier;

    #[test]
    fn test_ticket_quota() {
        let limits = PlanLimits::for_tier(PlanTier::Free);
        let mut usage = CompanyUsage {
            tickets_this_month: 29,
            ..Default::default()
        };
        assert!(QuotaEnforcer::check(&limits, &usage, Resource::TicketsPerMonth).is_allowed());

        usage.tickets_this_month = 30;
        assert_eq!(
            QuotaEnforcer::check(&limits, &usage, Resource::TicketsPerMonth),
            QuotaResult::Exceeded {
                resource: Resource::TicketsPerMonth,
                limit: 30
            }
        );
    }

    #[test]
    fn test_unlimited_plan() {
        let limits = PlanLimits::for_tier(PlanTier::Enterprise);
        let usage = CompanyUsage {
            users: 100_000,
            ..Default::default()
        };
        assert!(QuotaEnforcer::check(&limits, &usage, Resource::Users).is_allowed());
    }

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }
}
