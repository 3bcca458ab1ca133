//! Admin handlers
//!
//! All of these take [`SuperUser`], so non-administrators are redirected
//! before any data is read.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use mse_core::Id;
use mse_models::{Assignment, ImageSetSummary, Invitation, NewAssignment};
use mse_reports::{export_filename, to_json, AdminDashboard, ClinicianStats};
use mse_services::{AssignmentService, InvitationService, ReportingService};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, SuperUser};

/// GET /admin/panel
pub async fn panel(
    State(state): State<AppState>,
    admin: SuperUser,
) -> ApiResult<Json<AdminDashboard>> {
    let dashboard = ReportingService::new(state.stores.clone())
        .dashboard(&admin)
        .await?;
    Ok(Json(dashboard))
}

/// GET /admin/clinicians/:id/stats
pub async fn clinician_stats(
    State(state): State<AppState>,
    admin: SuperUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<ClinicianStats>> {
    let stats = ReportingService::new(state.stores.clone())
        .clinician_stats(&admin, id)
        .await?;
    Ok(Json(stats))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub ids: Vec<Id>,
}

/// POST /admin/evaluations/export
///
/// Responds with the export document as a JSON attachment.
pub async fn export_evaluations(
    State(state): State<AppState>,
    admin: SuperUser,
    Json(request): Json<ExportRequest>,
) -> ApiResult<impl IntoResponse> {
    let records = ReportingService::new(state.stores.clone())
        .export(&admin, request.ids)
        .await?;
    let body = to_json(&records).map_err(|e| ApiError::internal(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(chrono::Utc::now())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Invitation with its shareable registration path
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub registration_path: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            registration_path: invitation.registration_path(),
            invitation,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateInvitationsRequest {
    pub count: Option<usize>,
}

/// GET /admin/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    _admin: SuperUser,
) -> ApiResult<Json<Vec<InvitationResponse>>> {
    let invitations = InvitationService::new(state.stores.clone()).list().await?;
    Ok(Json(invitations.into_iter().map(Into::into).collect()))
}

/// POST /admin/invitations
pub async fn create_invitations(
    State(state): State<AppState>,
    _admin: SuperUser,
    body: Option<Json<CreateInvitationsRequest>>,
) -> ApiResult<(StatusCode, Json<Vec<InvitationResponse>>)> {
    let count = body.and_then(|Json(b)| b.count).unwrap_or(1);
    let created = InvitationService::new(state.stores.clone())
        .create(count)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(Into::into).collect()),
    ))
}

/// GET /admin/image-sets
pub async fn list_image_sets(
    State(state): State<AppState>,
    _admin: SuperUser,
) -> ApiResult<Json<Vec<ImageSetSummary>>> {
    let sets = state
        .stores
        .image_sets
        .list_summaries()
        .await
        .map_err(mse_core::MseError::from)?;
    Ok(Json(sets))
}

/// POST /admin/assignments
pub async fn create_assignment(
    State(state): State<AppState>,
    admin: SuperUser,
    Json(new): Json<NewAssignment>,
) -> ApiResult<(StatusCode, Json<Assignment>)> {
    let assignment = AssignmentService::new(state.stores.clone())
        .create(&admin, new)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
