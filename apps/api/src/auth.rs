use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

/// The signed-in caller, resolved from `Authorization: Bearer <token>`.
/// Handlers that take an `Owner` reject unauthenticated requests with 401
/// before any pipeline work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(String);

impl Owner {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        match state.config.auth_tokens.get(token) {
            Some(owner) => Ok(Owner(owner.clone())),
            None => {
                warn!("Rejected request with unknown bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}
