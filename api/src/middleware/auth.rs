//! Bearer token authentication
//!
//! Tokens only carry the user id. Company and roles are read from the user
//! directory on every request, so a role change takes effect immediately.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use itdesk_common::UserId;
use itdesk_support::SupportError;
use itdesk_tenant::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::TokenResponse;
use crate::ApiState;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: i64,
}

/// HS256 signing material
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(i64::from(ttl_hours)),
        }
    }

    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<TokenResponse, ApiError> {
        let expires_at = (now + self.ttl).timestamp();
        let claims = Claims { sub: user_id, exp: expires_at };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(TokenResponse { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

/// Authenticated caller, resolved from the directory
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".into()))?;

        let claims = state.tokens.verify(token)?;
        let user = state
            .users
            .get(&claims.sub)
            .await
            .map_err(SupportError::from)?
            .ok_or_else(|| ApiError::Unauthorized(format!("unknown user {}", claims.sub)))?;
        Ok(AuthUser(user))
    }
}
