//! Account endpoints and the token extractor
//!
//! A token is accepted from `Authorization: Bearer <token>` or, for browser
//! WebSocket clients that cannot set headers, from a `?token=` query parameter.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Query, State},
    http::request::Parts,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;

use super::response::{ApiError, ApiResult, NoContent};
use super::state::RelayState;
use crate::service::{LogInRequest, LogInResponse};

/// Username taken from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn username(&self) -> &str {
        &self.0
    }

    pub fn into_username(self) -> String {
        self.0
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl FromRequestParts<RelayState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &RelayState) -> Result<Self, Self::Rejection> {
        let token = match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => bearer.token().to_string(),
            Err(_) => Query::<TokenQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|Query(query)| query.token)
                .filter(|token| !token.is_empty())
                .ok_or(ApiError::MissingAuth)?,
        };

        let username = state.jwt().verify_username(&token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected token");
            ApiError::App(e)
        })?;

        Ok(Identity(username))
    }
}

/// Log in, registering the account on first use
///
/// POST /api/login
pub async fn login(
    State(state): State<RelayState>,
    body: Result<Json<LogInRequest>, JsonRejection>,
) -> ApiResult<Json<LogInResponse>> {
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let token = state.chat().log_in_or_register(request).await?;
    Ok(Json(LogInResponse { token }))
}

/// Log out the token's user
///
/// POST /api/logout
pub async fn logout(State(state): State<RelayState>, identity: Identity) -> ApiResult<NoContent> {
    state.chat().log_out(Some(identity.username())).await?;
    Ok(NoContent)
}
