//! Registration, login and logout handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use mse_models::{Clinician, RegistrationForm};
use mse_services::{InvitationService, RegistrationService, TokenCheck};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{session_id, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/invitations/validate
pub async fn validate_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> ApiResult<Json<TokenCheck>> {
    let check = InvitationService::new(state.stores.clone())
        .validate_token(&body.token)
        .await?;
    Ok(Json(check))
}

/// POST /api/register
///
/// The new clinician is logged in straight away.
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> ApiResult<impl IntoResponse> {
    let clinician = RegistrationService::with_password_min_length(
        state.stores.clone(),
        state.config.auth.password_min_length,
    )
    .register(form)
    .await?;

    let session = state.authentication().start_session(&clinician)?;
    Ok(with_session_cookie(&state, &session.id, StatusCode::CREATED, clinician))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (clinician, session) = state
        .authentication()
        .login(&body.username, &body.password)
        .await?;
    Ok(with_session_cookie(&state, &session.id, StatusCode::OK, clinician))
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    if let Some(id) = session_id(&headers) {
        state.authentication().logout(&id)?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.cookie_config().build_clear_cookie())],
    ))
}

fn with_session_cookie(
    state: &AppState,
    session_id: &str,
    status: StatusCode,
    clinician: Clinician,
) -> impl IntoResponse {
    (
        status,
        [(header::SET_COOKIE, state.cookie_config().build_cookie(session_id))],
        Json(clinician),
    )
}
