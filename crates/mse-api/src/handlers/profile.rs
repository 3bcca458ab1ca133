//! Profile handlers

use axum::{extract::State, Json};
use mse_models::{Clinician, ProfileUpdate};
use mse_services::ProfileService;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Clinician>> {
    let clinician = ProfileService::new(state.stores.clone()).get(&user).await?;
    Ok(Json(clinician))
}

/// PATCH /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Clinician>> {
    let clinician = ProfileService::new(state.stores.clone())
        .update(&user, update)
        .await?;
    Ok(Json(clinician))
}
