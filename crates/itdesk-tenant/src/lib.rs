//! Tenant Isolation for ITDesk
//!
//! Every company is a tenant; every tenant-owned row carries its company id.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     COMPANY REGISTRY                            │
//! │   ┌────────┐  ┌────────┐  ┌────────┐  ┌────────┐               │
//! │   │ Acme   │  │ Globex │  │ Initech│  │  ...   │               │
//! │   └───┬────┘  └───┬────┘  └───┬────┘  └────────┘               │
//! └───────┼───────────┼───────────┼────────────────────────────────┘
//!         │           │           │
//! ┌───────▼───────────▼───────────▼────────────────────────────────┐
//! │                     TENANT SCOPE FILTER                         │
//! │   actor.company_id == row.company_id | explicit system bypass   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod directory;
pub mod lifecycle;
pub mod limits;
pub mod model;
pub mod scope;

pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use lifecycle::{CompanyRegistry, LifecycleError};
pub use limits::{month_start, CompanyUsage, QuotaEnforcer, QuotaResult, Resource};
pub use model::{Company, PlanLimits, PlanTier, Role, User};
pub use scope::{ScopeError, SystemContext, TenantOwned, TenantScope, TenantStamp};
