//! Inventory and staff endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use itdesk_common::ProductId;
use itdesk_support::{Employee, Product};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::ApiState;

type Shared = State<Arc<ApiState>>;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id/stock", post(adjust_stock))
        .route("/:id/damaged", post(mark_damaged))
}

pub fn employee_router() -> Router<Arc<ApiState>> {
    Router::new().route("/", post(register_employee))
}

pub async fn list_products(
    State(state): Shared,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Product>>>> {
    let products = state.inventory.list_products(&user).await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn create_product(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Json(req): Json<ProductCreate>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = Product::new(req.name, req.quantity, req.minimum_stock, state.clock.now());
    let product = state.inventory.add_product(&user, product).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// Signed stock movement; negative deltas consume stock
pub async fn adjust_stock(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<ProductId>,
    Json(req): Json<StockAdjustment>,
) -> ApiResult<Json<ApiResponse<Product>>> {
    let product = state.inventory.adjust_stock(&user, &id, req.delta).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn mark_damaged(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<ApiResponse<Product>>> {
    let product = state.inventory.mark_damaged(&user, &id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn register_employee(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Json(req): Json<EmployeeCreate>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Employee>>)> {
    let employee = state.tickets.register_employee(&user, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(employee))))
}
