//! Application state and axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use mse_auth::{
    extract_session_id, CookieConfig, CurrentUser, MemorySessionStore, SessionStore,
    SESSION_COOKIE_NAME,
};
use mse_core::config::AppConfig;
use mse_db::Stores;
use mse_services::AuthenticationService;
use mse_storage::{MemoryStorage, Storage};

use crate::error::ApiError;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        storage: Arc<dyn Storage>,
        sessions: Arc<dyn SessionStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            stores,
            storage,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Everything in memory; used by tests and local experiments
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            Stores::in_memory(),
            Arc::new(MemoryStorage::new()),
            Arc::new(MemorySessionStore::new()),
            config,
        )
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.config.auth.session_ttl_seconds()
    }

    pub fn authentication(&self) -> AuthenticationService {
        AuthenticationService::new(self.stores.clone(), self.sessions.clone())
            .with_session_ttl(self.session_ttl_seconds())
    }

    pub fn cookie_config(&self) -> CookieConfig {
        let base = if self.config.auth.secure_cookies {
            CookieConfig::default()
        } else {
            CookieConfig::development()
        };
        base.with_max_age(self.session_ttl_seconds())
    }
}

/// Session id from the request's cookie header, if any
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| extract_session_id(cookie, SESSION_COOKIE_NAME))
        .filter(|id| !id.is_empty())
}

/// Resolve the caller from the session cookie
async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let Some(session_id) = session_id(&parts.headers) else {
        return Ok(None);
    };
    Ok(state.authentication().resolve(&session_id).await?)
}

/// Logged-in clinician; 401 otherwise
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match current_user(parts, &app_state).await? {
            Some(user) => Ok(AuthenticatedUser(user)),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Logged-in administrator
///
/// Anyone else is redirected to the login page with
/// `error=not_authenticated` or `error=admin_required`.
pub struct SuperUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for SuperUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match current_user(parts, &app_state).await? {
            Some(user) if user.is_superuser => Ok(SuperUser(user)),
            Some(user) => {
                tracing::warn!(clinician_id = user.id, path = %parts.uri.path(), "Admin access denied");
                Err(ApiError::login_redirect("admin_required"))
            }
            None => Err(ApiError::login_redirect("not_authenticated")),
        }
    }
}

impl std::ops::Deref for SuperUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
