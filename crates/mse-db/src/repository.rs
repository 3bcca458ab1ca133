//! Repository error types and shared helpers

use mse_core::error::MseError;
use mse_core::traits::Id;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`
    pub fn from_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        let is_unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if is_unique {
            RepositoryError::Conflict(message.into())
        } else {
            RepositoryError::Database(err)
        }
    }
}

impl From<RepositoryError> for MseError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => MseError::NotFound {
                entity,
                id: id.to_string(),
            },
            RepositoryError::Database(e) => {
                tracing::error!(error = %e, "database error");
                MseError::Database(e.to_string())
            }
            RepositoryError::Validation(msg) => MseError::invalid("base", msg),
            RepositoryError::Conflict(msg) => MseError::conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_is_not_conflict() {
        let err = RepositoryError::from_unique(sqlx::Error::RowNotFound, "taken");
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[test]
    fn test_into_mse_error() {
        let err: MseError = RepositoryError::Conflict("Name has already been taken".into()).into();
        assert_eq!(err.status_code(), 409);

        let err: MseError = RepositoryError::NotFound {
            entity: "Assignment",
            id: 4,
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Assignment 4 not found");
    }
}
