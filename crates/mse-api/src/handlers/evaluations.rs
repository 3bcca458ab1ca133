//! Evaluation and assignment handlers for clinicians

use axum::{extract::State, http::StatusCode, Json};
use mse_models::{AssignmentProgress, Evaluation, EvaluationSubmission};
use mse_services::{AssignmentService, EvaluationService, NextImage};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

fn evaluation_service(state: &AppState) -> EvaluationService {
    EvaluationService::new(state.stores.clone(), state.config.storage.media_url.clone())
}

/// GET /api/assignments
pub async fn list_own_assignments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<AssignmentProgress>>> {
    let rows = AssignmentService::new(state.stores.clone())
        .for_clinician(&user)
        .await?;
    Ok(Json(rows))
}

/// GET /api/evaluations/next
pub async fn next_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<NextImage>> {
    Ok(Json(evaluation_service(&state).next_image(&user).await?))
}

/// POST /api/evaluations
pub async fn submit_evaluation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(submission): Json<EvaluationSubmission>,
) -> ApiResult<(StatusCode, Json<Evaluation>)> {
    let evaluation = evaluation_service(&state)
        .submit(&user, &submission)
        .await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}
