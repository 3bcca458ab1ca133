//! Core error types for MedSynEval RS

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::traits::Entity;

/// Error returned by every service operation
///
/// Each variant maps onto one HTTP status; see [`MseError::status_code`].
#[derive(Error, Debug)]
pub enum MseError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MseError {
    pub fn not_found<E: Entity>(id: impl ToString) -> Self {
        MseError::NotFound {
            entity: E::TYPE_NAME,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        MseError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        MseError::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        MseError::Conflict {
            message: message.into(),
        }
    }

    /// Validation failure on a single field
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        MseError::Validation(errors)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            MseError::NotFound { .. } => 404,
            MseError::Unauthorized { .. } => 401,
            MseError::Forbidden { .. } => 403,
            MseError::Validation(_) => 422,
            MseError::Conflict { .. } => 409,
            MseError::Database(_) | MseError::Internal(_) => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Form errors collected before rejecting a request
///
/// `fields` maps a form field to its messages; `base` holds messages about
/// the request as a whole.
#[derive(Error, Debug, Default, Clone, Serialize)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub base: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.base.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.fields.get(field)
    }

    /// Base messages first, then `"<field> <message>"` in field order
    pub fn full_messages(&self) -> Vec<String> {
        self.base
            .iter()
            .cloned()
            .chain(self.fields.iter().flat_map(|(field, messages)| {
                messages.iter().map(move |m| format!("{} {}", field, m))
            }))
            .collect()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {}", self.full_messages().join(", "))
    }
}
