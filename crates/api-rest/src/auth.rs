//! Bearer-token authentication and role gating.
//!
//! Token issuance is not this service's business: a pre-provisioned
//! registry (token → user + role) is loaded at startup and injected into
//! the router state. The middleware resolves `Authorization: Bearer
//! <token>` against it and injects the resolved [`AuthUser`] into request
//! extensions for handlers; role checks happen per route.

use std::collections::HashMap;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use labo_types::Role;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, as resolved by the middleware.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// One line of the token file: a token and the user it authenticates.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub token: String,
    #[serde(flatten)]
    pub user: AuthUser,
}

/// Immutable token → user map.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, AuthUser>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from pre-provisioned entries.
    pub fn from_entries(entries: Vec<TokenEntry>) -> Self {
        let tokens = entries.into_iter().map(|e| (e.token, e.user)).collect();
        Self { tokens }
    }

    /// Parses the JSON token file: an array of
    /// `{"token", "userId", "username", "role"}` objects.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<TokenEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn insert(&mut self, token: impl Into<String>, user: AuthUser) {
        self.tokens.insert(token.into(), user);
    }

    pub fn resolve(&self, token: &str) -> Option<AuthUser> {
        self.tokens.get(token).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Require a valid bearer token on every request that passes through.
///
/// On success the resolved [`AuthUser`] is available to handlers as an
/// extension; on failure the request is answered with 401 and never reaches
/// a handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(user) = token.and_then(|t| state.tokens.resolve(t)) else {
        return ApiError::Authentication.into_response();
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Checks that the caller holds one of `allowed`.
///
/// # Errors
///
/// [`ApiError::Authorization`] (403) otherwise.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        tracing::debug!(user = %user.username, role = %user.role, "role not permitted");
        Err(ApiError::Authorization)
    }
}
