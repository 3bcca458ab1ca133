//! Invitation model
//!
//! Table: invitations

use chrono::{DateTime, Utc};
use mse_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Single-use registration credential
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Id,
    pub token: Uuid,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    /// Clinician registered with this token
    pub used_by_id: Option<Id>,
}

impl Identifiable for Invitation {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Invitation {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Entity for Invitation {
    const TABLE_NAME: &'static str = "invitations";
    const TYPE_NAME: &'static str = "Invitation";
}

impl Invitation {
    /// Registration URL for this token, relative to the site root
    pub fn registration_path(&self) -> String {
        format!("/register?token={}", self.token)
    }
}
