//! Product Aggregate
//!
//! Inventory item with a stock level. Raises `LowStock` when the quantity
//! drops below the minimum and `ProductDamaged` the first time it is
//! reported damaged.
use chrono::{DateTime, Utc};
use itdesk_common::{CompanyId, EventMetadata, ProductId, UserId};
use itdesk_tenant::{TenantOwned, TenantStamp};
use serde::{Deserialize, Serialize};

use crate::domain::events::SupportEvent;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    company_id: Option<CompanyId>,
    name: String,
    quantity: u32,
    minimum_stock: u32,
    damaged: bool,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
    #[serde(skip)]
    events: Vec<SupportEvent>,
}

impl Product {
    pub fn new(name: impl Into<String>, quantity: u32, minimum_stock: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::new(),
            company_id: None,
            name: name.into(),
            quantity,
            minimum_stock,
            damaged: false,
            updated_at: now,
            version: 0,
            events: vec![],
        }
    }

    pub fn id(&self) -> &ProductId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn minimum_stock(&self) -> u32 { self.minimum_stock }
    pub fn is_damaged(&self) -> bool { self.damaged }
    pub fn is_low(&self) -> bool { self.quantity < self.minimum_stock }
    pub fn version(&self) -> u64 { self.version }

    /// Record the version the store now holds
    pub fn mark_persisted(&mut self, version: u64) { self.version = version; }

    /// Apply a signed stock movement. Stock never goes negative.
    pub fn adjust_stock(&mut self, delta: i64, actor: UserId, now: DateTime<Utc>) -> Result<u32, ProductError> {
        let metadata = self.metadata(now)?;
        let next = i64::from(self.quantity).checked_add(delta).ok_or(ProductError::QuantityOverflow)?;
        if next < 0 {
            return Err(ProductError::InsufficientStock { available: self.quantity, requested: delta.unsigned_abs() });
        }
        let next = u32::try_from(next).map_err(|_| ProductError::QuantityOverflow)?;
        let was_low = self.is_low();
        self.quantity = next;
        self.updated_at = now;
        if !was_low && self.is_low() {
            self.raise_event(SupportEvent::LowStock {
                metadata,
                product_id: self.id,
                name: self.name.clone(),
                quantity: self.quantity,
                minimum: self.minimum_stock,
                changed_by: actor,
            });
        }
        Ok(self.quantity)
    }

    /// Flag the product as damaged. Returns false if it already was.
    pub fn mark_damaged(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<bool, ProductError> {
        if self.damaged { return Ok(false); }
        let metadata = self.metadata(now)?;
        self.damaged = true;
        self.updated_at = now;
        self.raise_event(SupportEvent::ProductDamaged {
            metadata,
            product_id: self.id,
            name: self.name.clone(),
            reported_by: actor,
        });
        Ok(true)
    }

    pub fn take_events(&mut self) -> Vec<SupportEvent> { std::mem::take(&mut self.events) }

    fn metadata(&self, now: DateTime<Utc>) -> Result<EventMetadata, ProductError> {
        let company = self.company_id.ok_or(ProductError::Unstamped)?;
        Ok(EventMetadata::new(company, self.id, "Product", now))
    }
    fn raise_event(&mut self, e: SupportEvent) { self.events.push(e); }
}

impl TenantOwned for Product {
    fn company_id(&self) -> Option<CompanyId> { self.company_id }
}

impl TenantStamp for Product {
    fn assign_company(&mut self, company_id: CompanyId) { self.company_id = Some(company_id); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u64 },
    #[error("stock quantity overflow")]
    QuantityOverflow,
    #[error("product has no company")]
    Unstamped,
}

impl ProductError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientStock { available, .. } => format!("Only {} units are in stock.", available),
            Self::QuantityOverflow => "That stock quantity is too large.".into(),
            Self::Unstamped => "Products must belong to a company.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stocked(qty: u32, min: u32) -> Product {
        let mut p = Product::new("USB-C dock", qty, min, Utc::now());
        p.assign_company(CompanyId::new());
        p
    }

    #[test]
    fn test_low_stock_fires_on_crossing_only() {
        let mut p = stocked(5, 3);
        let actor = UserId::new();
        p.adjust_stock(-2, actor, Utc::now()).unwrap();
        assert!(p.take_events().is_empty());

        p.adjust_stock(-1, actor, Utc::now()).unwrap();
        assert!(matches!(p.take_events().as_slice(), [SupportEvent::LowStock { quantity: 2, minimum: 3, .. }]));

        p.adjust_stock(-1, actor, Utc::now()).unwrap();
        assert!(p.take_events().is_empty());
    }

    #[test]
    fn test_stock_never_negative() {
        let mut p = stocked(1, 0);
        let err = p.adjust_stock(-2, UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, ProductError::InsufficientStock { available: 1, requested: 2 });
        assert_eq!(p.quantity(), 1);
    }

    #[test]
    fn test_huge_delta_is_overflow_not_panic() {
        let mut p = stocked(1, 0);
        assert_eq!(p.adjust_stock(i64::MAX, UserId::new(), Utc::now()), Err(ProductError::QuantityOverflow));
        assert_eq!(p.adjust_stock(i64::from(u32::MAX), UserId::new(), Utc::now()), Err(ProductError::QuantityOverflow));
        assert_eq!(p.quantity(), 1);
        assert!(p.take_events().is_empty());
    }

    #[test]
    fn test_damaged_reported_once() {
        let mut p = stocked(1, 0);
        assert!(p.mark_damaged(UserId::new(), Utc::now()).unwrap());
        assert!(!p.mark_damaged(UserId::new(), Utc::now()).unwrap());
        assert_eq!(p.take_events().len(), 1);
    }
}
