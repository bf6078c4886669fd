//! Session resolution: maps the `token` cookie to a user.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use common::UserId;
use domain::BusinessError;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Port resolving an opaque session token to the logged-in user.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<UserId>;
}

/// In-memory sessions keyed by random tokens.
#[derive(Clone, Default)]
pub struct InMemorySessions {
    sessions: Arc<RwLock<HashMap<String, UserId>>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `user_id` and returns its token.
    pub async fn login(&self, user_id: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), user_id);
        tracing::debug!(%user_id, "session opened");
        token
    }
}

#[async_trait]
impl SessionResolver for InMemorySessions {
    async fn resolve(&self, token: &str) -> Option<UserId> {
        self.sessions.read().await.get(token).copied()
    }
}

/// The user behind the request's session cookie.
///
/// Rejects with `NEED_LOGIN` when the cookie is missing or unknown.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(BusinessError::NeedLogin)?;
        let user_id = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(BusinessError::NeedLogin)?;
        Ok(CurrentUser(user_id))
    }
}

fn session_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
