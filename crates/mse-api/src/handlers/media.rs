//! Image bytes for logged-in clinicians

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use mse_storage::{content_type_for, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /media/*key
pub async fn get_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let data = state.storage.get(&key).await.map_err(|err| match err {
        StorageError::NotFound(_) => ApiError::not_found(format!("Image {} not found", key)),
        StorageError::InvalidPath(path) => ApiError::bad_request(format!("Invalid path: {}", path)),
        StorageError::IoError(e) => {
            tracing::error!(key = %key, error = %e, "Failed to read media");
            ApiError::internal("Failed to read image")
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&key))], data))
}
