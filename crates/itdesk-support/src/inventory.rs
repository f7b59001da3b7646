//! Inventory service
//!
//! Stock movements and damage reports. Supervisors and technicians may act;
//! viewers only read.

use itdesk_common::{CompanyId, ProductId, RepositoryError};
use itdesk_tenant::{QuotaEnforcer, QuotaResult, Resource, Role, TenantScope, User};

use crate::domain::Product;
use crate::notify::NotificationDispatcher;
use crate::service::SupportDeps;
use crate::usage::UsageReporter;
use crate::{quota_exceeded, SupportError, SupportResult};

const STOCK_HANDLERS: &[Role] = &[Role::Admin, Role::Manager, Role::Technician];
const SUPERVISORS: &[Role] = &[Role::Admin, Role::Manager];

#[derive(Clone)]
pub struct InventoryService {
    deps: SupportDeps,
    dispatcher: NotificationDispatcher,
    usage: UsageReporter,
}

impl InventoryService {
    pub fn new(deps: SupportDeps) -> Self {
        Self { dispatcher: deps.dispatcher(), usage: deps.usage(), deps }
    }

    pub async fn list_products(&self, actor: &User) -> SupportResult<Vec<Product>> {
        let Some(company) = actor.company_id else { return Ok(vec![]) };
        Ok(self.deps.products.list(TenantScope::for_company(company)).await?)
    }

    pub async fn add_product(&self, actor: &User, product: Product) -> SupportResult<Product> {
        let company_id = self.member_company(actor)?;
        if !actor.has_any_role(SUPERVISORS) {
            return Err(SupportError::Forbidden { action: "add_product", rule: "supervisor" });
        }
        let company = self.deps.companies.writable(&company_id)?;
        let usage = self.usage.usage(company_id).await?;
        if let QuotaResult::Exceeded { resource, limit } =
            QuotaEnforcer::check(&company.limits, &usage, Resource::Products)
        {
            return Err(quota_exceeded(resource, limit));
        }

        let mut product = product;
        TenantScope::for_company(company_id).stamp(&mut product)?;
        self.deps.products.insert(&product).await?;
        tracing::info!(product_id = %product.id(), company_id = %company_id, "product added");
        Ok(product)
    }

    /// Apply a signed stock movement
    pub async fn adjust_stock(&self, actor: &User, id: &ProductId, delta: i64) -> SupportResult<Product> {
        let mut product = self.load_for_write(actor, id, "adjust_stock").await?;
        let quantity = product.adjust_stock(delta, actor.id, self.deps.clock.now())?;
        tracing::debug!(product_id = %id, delta, quantity, "stock adjusted");
        self.persist(product).await
    }

    pub async fn mark_damaged(&self, actor: &User, id: &ProductId) -> SupportResult<Product> {
        let mut product = self.load_for_write(actor, id, "mark_damaged").await?;
        if !product.mark_damaged(actor.id, self.deps.clock.now())? {
            return Ok(product);
        }
        tracing::info!(product_id = %id, user_id = %actor.id, "product reported damaged");
        self.persist(product).await
    }

    fn member_company(&self, actor: &User) -> SupportResult<CompanyId> {
        actor.company_id.ok_or_else(|| SupportError::NotFound("company".into()))
    }

    async fn load_for_write(&self, actor: &User, id: &ProductId, action: &'static str) -> SupportResult<Product> {
        let company_id = self.member_company(actor)?;
        let product = self
            .deps
            .products
            .find(TenantScope::for_company(company_id), id)
            .await?
            .ok_or_else(|| SupportError::NotFound(id.to_string()))?;
        self.deps.companies.writable(&company_id)?;
        if !actor.has_any_role(STOCK_HANDLERS) {
            return Err(SupportError::Forbidden { action, rule: "stock-handlers" });
        }
        Ok(product)
    }

    async fn persist(&self, mut product: Product) -> SupportResult<Product> {
        let events = product.take_events();
        let version = self.deps.products.save(&product).await.map_err(|e| match e {
            RepositoryError::Conflict(technical) => SupportError::business(
                technical,
                "This product was changed by someone else. Reload it and try again.",
            ),
            other => SupportError::Repository(other),
        })?;
        product.mark_persisted(version);
        self.dispatcher.dispatch_all(&events).await;
        Ok(product)
    }
}
