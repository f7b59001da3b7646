//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itdesk_support::SupportError;

use crate::models::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Support(#[from] SupportError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Support(SupportError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Support(SupportError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Self::Support(SupportError::BusinessRule { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Support(SupportError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) | Self::Token(_) => "unauthorized",
            Self::Support(SupportError::NotFound(_)) => "not_found",
            Self::Support(SupportError::Forbidden { .. }) => "forbidden",
            Self::Support(SupportError::BusinessRule { .. }) => "business_rule",
            Self::Support(SupportError::Repository(_)) => "internal",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(_) | Self::Token(_) => "Authentication required.".into(),
            Self::Support(e) => e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = ApiResponse::<()>::error(self.code(), &self.public_message());
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
