//! Ticket endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use itdesk_common::TicketId;
use itdesk_support::{SlaStatus, Ticket, TicketChanges, TicketComment, TicketLog};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::ApiState;

type Shared = State<Arc<ApiState>>;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/:id", get(get_ticket).put(update_ticket).delete(delete_ticket))
        .route("/:id/assign", post(assign_ticket))
        .route("/:id/status", post(change_status))
        .route("/:id/close", post(close_ticket))
        .route("/:id/comments", get(list_comments).post(add_comment))
        .route("/:id/logs", get(list_logs))
        .route("/:id/sla", get(sla_status))
}

/// Tickets the caller may view, newest first
pub async fn list_tickets(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Query(params): Query<TicketListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Ticket>>>> {
    let tickets = state.tickets.list_tickets(&user, &params.into()).await?;
    Ok(Json(ApiResponse::success(tickets)))
}

pub async fn create_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Json(input): Json<TicketCreate>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Ticket>>)> {
    let ticket = state.tickets.create_ticket(&user, input.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket))))
}

pub async fn get_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.tickets.get_ticket(&user, &id).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn update_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
    Json(changes): Json<TicketChanges>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.tickets.update_ticket(&user, &id, changes).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn delete_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
) -> ApiResult<StatusCode> {
    state.tickets.delete_ticket(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.tickets.assign_ticket(&user, &id, req.assignee).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn change_status(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
    Json(req): Json<StatusChange>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.tickets.change_status(&user, &id, req.status, req.resolution).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn close_ticket(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
    body: Option<Json<CloseRequest>>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let resolution = body.and_then(|Json(req)| req.resolution);
    let ticket = state.tickets.close_ticket(&user, &id, resolution).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn list_comments(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<Vec<TicketComment>>>> {
    let comments = state.tickets.comments(&user, &id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

pub async fn add_comment(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
    Json(req): Json<CommentCreate>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TicketComment>>)> {
    let comment = state.tickets.add_comment(&user, &id, &req.body, req.internal).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// Audit trail, oldest first
pub async fn list_logs(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<Vec<TicketLog>>>> {
    let logs = state.tickets.logs(&user, &id).await?;
    Ok(Json(ApiResponse::success(logs)))
}

pub async fn sla_status(
    State(state): Shared,
    AuthUser(user): AuthUser,
    Path(id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<SlaStatus>>> {
    let status = state.tickets.sla_status(&user, &id).await?;
    Ok(Json(ApiResponse::success(status)))
}
