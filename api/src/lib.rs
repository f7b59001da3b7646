//! IT help desk HTTP API
//!
//! Thin axum layer over the support services. Every handler resolves the
//! caller from the bearer token and hands the full `User` to the service, which
//! owns tenancy, access rules and SLA bookkeeping.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use itdesk_common::SharedClock;
use itdesk_support::{
    InMemoryEmployeeDirectory, InMemoryProductRepository, InMemoryTicketRepository, InventoryService, Notifier,
    SupportDeps, TicketService,
};
use itdesk_tenant::{CompanyRegistry, InMemoryUserDirectory, PlanTier, Role, User, UserDirectory};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult};
pub use middleware::{AuthUser, TokenKeys};
pub use models::*;

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub tickets: TicketService,
    pub inventory: InventoryService,
    pub users: Arc<dyn UserDirectory>,
    pub tokens: TokenKeys,
    pub clock: SharedClock,
}

impl ApiState {
    pub fn new(deps: &SupportDeps, config: &ServiceConfig) -> Self {
        Self {
            tickets: TicketService::new(deps.clone(), Arc::new(config.sla.table.clone()), config.access),
            inventory: InventoryService::new(deps.clone()),
            users: deps.users.clone(),
            tokens: TokenKeys::new(&config.auth.secret, config.auth.token_ttl_hours),
            clock: deps.clock.clone(),
        }
    }
}

/// Collaborators backed by process memory
pub fn in_memory_deps(notifier: Arc<dyn Notifier>, clock: SharedClock) -> SupportDeps {
    SupportDeps {
        tickets: Arc::new(InMemoryTicketRepository::new()),
        employees: Arc::new(InMemoryEmployeeDirectory::new()),
        products: Arc::new(InMemoryProductRepository::new()),
        users: Arc::new(InMemoryUserDirectory::new()),
        companies: Arc::new(CompanyRegistry::new()),
        notifier,
        clock,
    }
}

/// Create the configured company and its owner
pub async fn bootstrap(deps: &SupportDeps, seed: &config::BootstrapConfig) -> ApiResult<User> {
    let company = deps.companies.create(&seed.company, PlanTier::Enterprise, deps.clock.now());
    let mut admin = User::new(Some(company.id), &seed.admin_name, &seed.admin_email, &[Role::Admin]);
    admin.is_owner = true;
    deps.users.save(&admin).await.map_err(itdesk_support::SupportError::from)?;
    tracing::info!(company_id = %company.id, user_id = %admin.id, "bootstrap company created");
    Ok(admin)
}

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(Arc::new(state))
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .nest("/tickets", routes::tickets::router())
        .nest("/products", routes::products::router())
        .nest("/employees", routes::products::employee_router())
}
