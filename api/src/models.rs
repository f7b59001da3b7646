//! API Models

use itdesk_common::{EmployeeId, ProductId, UserId};
use itdesk_support::{Employee, NewTicket, Priority, TicketFilter, TicketStatus, TicketType};
use serde::{Deserialize, Serialize};

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse { code: code.to_string(), message: message.to_string() }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============ Tickets ============

/// Ticket creation request. The company always comes from the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, rename = "type")]
    pub ticket_type: TicketType,
    pub product_id: Option<ProductId>,
    pub employee_id: Option<EmployeeId>,
    pub assigned_to: Option<UserId>,
}

impl From<TicketCreate> for NewTicket {
    fn from(req: TicketCreate) -> Self {
        NewTicket {
            company_id: None,
            title: req.title,
            description: req.description,
            priority: req.priority,
            ticket_type: req.ticket_type,
            product_id: req.product_id,
            employee_id: req.employee_id,
            assigned_to: req.assigned_to,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TicketListParams {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
    pub sla_violated: Option<bool>,
}

impl From<TicketListParams> for TicketFilter {
    fn from(p: TicketListParams) -> Self {
        TicketFilter {
            status: p.status,
            priority: p.priority,
            assigned_to: p.assigned_to,
            sla_violated: p.sla_violated,
            created_since: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignRequest {
    pub assignee: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TicketStatus,
    pub resolution: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CloseRequest {
    pub resolution: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentCreate {
    pub body: String,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmployeeCreate {
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub user_id: Option<UserId>,
}

impl From<EmployeeCreate> for Employee {
    fn from(req: EmployeeCreate) -> Self {
        let mut employee = Employee::new(req.name, req.email);
        employee.department = req.department;
        employee.user_id = req.user_id;
        employee
    }
}

// ============ Inventory ============

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub minimum_stock: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}
