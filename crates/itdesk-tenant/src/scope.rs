//! Tenant Scope Filter
//!
//! Every read or write on a tenant-owned row goes through a [`TenantScope`].
//! The scope is always passed explicitly; there is no ambient "current
//! tenant". A row outside the scope is simply absent: callers see not-found,
//! exactly as if the row did not exist.

use crate::model::User;
use itdesk_common::CompanyId;

/// Anything stored per company
pub trait TenantOwned {
    /// Owning company, `None` before it is stamped
    fn company_id(&self) -> Option<CompanyId>;
}

/// A row that has not been persisted yet and may still receive its company.
/// Persisted aggregates do not implement this: their company is immutable.
pub trait TenantStamp: TenantOwned {
    /// Set the owning company. Only called by [`TenantScope::stamp`].
    fn assign_company(&mut self, company_id: CompanyId);
}

/// Capability for trusted internal jobs (SLA sweep, usage statistics).
///
/// Request handlers never construct one, so the bypass below is unreachable
/// from user-facing code paths.
#[derive(Debug)]
pub struct SystemContext {
    reason: &'static str,
}

impl SystemContext {
    /// Open a system context for `reason`
    pub fn internal(reason: &'static str) -> Self {
        tracing::debug!(reason, "system context opened");
        Self { reason }
    }

    /// Why this context exists
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// Row visibility for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Only rows of this company
    Company(CompanyId),
    /// No restriction: unauthenticated actor, company-less actor, or system bypass
    Unscoped,
}

impl TenantScope {
    /// Scope for an acting user. Restricted when the actor is authenticated and
    /// has a company; unscoped otherwise.
    pub fn for_actor(actor: Option<&User>) -> Self {
        match actor.and_then(|u| u.company_id) {
            Some(company_id) => Self::Company(company_id),
            None => Self::Unscoped,
        }
    }

    /// Scope pinned to one company
    pub fn for_company(company_id: CompanyId) -> Self {
        Self::Company(company_id)
    }

    /// Explicit cross-tenant escape hatch
    pub fn without_tenant_scope(ctx: &SystemContext) -> Self {
        tracing::info!(reason = ctx.reason(), "tenant scope bypassed");
        Self::Unscoped
    }

    /// Company this scope is pinned to
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::Company(id) => Some(*id),
            Self::Unscoped => None,
        }
    }

    /// Whether the scope filters rows
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Company(_))
    }

    /// Whether `entity` is visible in this scope
    pub fn admits<E: TenantOwned + ?Sized>(&self, entity: &E) -> bool {
        match self {
            Self::Company(id) => entity.company_id() == Some(*id),
            Self::Unscoped => true,
        }
    }

    /// Restrict a row set to this scope
    pub fn apply<'a, E, I>(&self, rows: I) -> impl Iterator<Item = &'a E> + 'a
    where
        E: TenantOwned + 'a,
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: 'a,
    {
        let scope = *self;
        rows.into_iter().filter(move |row| scope.admits(*row))
    }

    /// Single-row lookup through the scope: out-of-scope rows vanish
    pub fn visible<E: TenantOwned>(&self, row: Option<E>) -> Option<E> {
        row.filter(|r| self.admits(r))
    }

    /// Stamp the owning company before the first write.
    ///
    /// An unset company is filled from the scope; a preset company must match.
    pub fn stamp<E: TenantStamp>(&self, entity: &mut E) -> Result<CompanyId, ScopeError> {
        match (self, entity.company_id()) {
            (Self::Company(id), None) => {
                entity.assign_company(*id);
                Ok(*id)
            }
            (Self::Company(id), Some(existing)) if existing == *id => Ok(existing),
            (Self::Company(id), Some(existing)) => Err(ScopeError::CompanyMismatch {
                scope: *id,
                entity: existing,
            }),
            (Self::Unscoped, Some(existing)) => Ok(existing),
            (Self::Unscoped, None) => Err(ScopeError::MissingCompany),
        }
    }
}

/// Errors raised while stamping a new row
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("entity belongs to company {entity}, actor scope is {scope}")]
    CompanyMismatch { scope: CompanyId, entity: CompanyId },
    #[error("entity has no company and the scope cannot supply one")]
    MissingCompany,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[derive(Debug, Clone)]
    struct Asset {
        company_id: Option<CompanyId>,
        name: &'static str,
    }

    impl TenantOwned for Asset {
        fn company_id(&self) -> Option<CompanyId> {
            self.company_id
        }
    }

    impl TenantStamp for Asset {
        fn assign_company(&mut self, company_id: CompanyId) {
            self.company_id = Some(company_id);
        }
    }

    fn asset(company: CompanyId, name: &'static str) -> Asset {
        Asset {
            company_id: Some(company),
            name,
        }
    }

    #[test]
    fn test_scope_isolates_tenants() {
        let tenant_a = CompanyId::new();
        let tenant_b = CompanyId::new();
        let rows = vec![asset(tenant_a, "laptop"), asset(tenant_b, "printer")];

        let user = User::new(Some(tenant_a), "Ana", "ana@a.test", &[Role::Admin]);
        let scope = TenantScope::for_actor(Some(&user));

        let names: Vec<_> = scope.apply(&rows).map(|a| a.name).collect();
        assert_eq!(names, vec!["laptop"]);
        assert!(scope.visible(Some(rows[1].clone())).is_none());
    }

    #[test]
    fn test_unauthenticated_is_unscoped() {
        assert_eq!(TenantScope::for_actor(None), TenantScope::Unscoped);

        let onboarding = User::new(None, "New", "new@x.test", &[Role::Viewer]);
        assert!(!TenantScope::for_actor(Some(&onboarding)).is_restricted());
    }

    #[test]
    fn test_bypass_sees_everything() {
        let rows = vec![asset(CompanyId::new(), "a"), asset(CompanyId::new(), "b")];
        let ctx = SystemContext::internal("usage statistics");
        let scope = TenantScope::without_tenant_scope(&ctx);
        assert_eq!(scope.apply(&rows).count(), 2);
    }

    #[test]
    fn test_stamp_populates_company() {
        let company = CompanyId::new();
        let scope = TenantScope::for_company(company);
        let mut fresh = Asset {
            company_id: None,
            name: "dock",
        };

        assert_eq!(scope.stamp(&mut fresh), Ok(company));
        assert_eq!(fresh.company_id, Some(company));
    }

    #[test]
    fn test_stamp_rejects_foreign_company() {
        let scope = TenantScope::for_company(CompanyId::new());
        let mut foreign = asset(CompanyId::new(), "x");
        assert!(matches!(
            scope.stamp(&mut foreign),
            Err(ScopeError::CompanyMismatch { .. })
        ));

        let mut orphan = Asset {
            company_id: None,
            name: "y",
        };
        assert_eq!(
            TenantScope::Unscoped.stamp(&mut orphan),
            Err(ScopeError::MissingCompany)
        );
    }
}
