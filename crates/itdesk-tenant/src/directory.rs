//! User directory
//!
//! Read side of the authentication collaborator: resolves user accounts and
//! company membership for policy checks and notification fan-out.

use crate::model::{Role, User};
use async_trait::async_trait;
use dashmap::DashMap;
use itdesk_common::{CompanyId, RepoResult, RepositoryError, UserId};

/// User directory trait
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Get user by ID
    async fn get(&self, id: &UserId) -> RepoResult<Option<User>>;

    /// All members of a company
    async fn members(&self, company_id: &CompanyId) -> RepoResult<Vec<User>>;

    /// Members of a company holding any of `roles`
    async fn members_with_roles(
        &self,
        company_id: &CompanyId,
        roles: &[Role],
    ) -> RepoResult<Vec<User>> {
        Ok(self
            .members(company_id)
            .await?
            .into_iter()
            .filter(|u| u.has_any_role(roles))
            .collect())
    }

    /// Insert or replace a user
    async fn save(&self, user: &User) -> RepoResult<()>;
}

/// In-memory user directory (for testing and development)
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get(&self, id: &UserId) -> RepoResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn members(&self, company_id: &CompanyId) -> RepoResult<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.belongs_to(*company_id))
            .map(|u| u.value().clone())
            .collect())
    }

    async fn save(&self, user: &User) -> RepoResult<()> {
        if user.roles.is_empty() {
            return Err(RepositoryError::Conflict(format!(
                "user {} must hold at least one role",
                user.id
            )));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }
}
