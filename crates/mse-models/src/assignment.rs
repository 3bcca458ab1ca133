//! Assignment model
//!
//! Tables: assignments, assignment_images

use chrono::{DateTime, Utc};
use mse_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A clinician's task to evaluate (part of) an image set
///
/// An empty image subset means every image of the set is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Id,
    pub clinician_id: Id,
    pub image_set_id: Id,
    pub assigned_by_id: Option<Id>,
    pub assigned_at: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Identifiable for Assignment {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Assignment {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.assigned_at)
    }
}

impl Entity for Assignment {
    const TABLE_NAME: &'static str = "assignments";
    const TYPE_NAME: &'static str = "Assignment";
}

/// Data for inserting an assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAssignment {
    pub clinician_id: Id,
    pub image_set_id: Id,
    #[serde(default)]
    pub assigned_by_id: Option<Id>,
    /// Optional subset of the set's images
    #[serde(default)]
    pub image_ids: Vec<Id>,
}

/// Assignment together with how far the clinician got
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentProgress {
    pub assignment: Assignment,
    pub image_set_name: String,
    pub clinician_username: String,
    pub evaluated: usize,
    pub assigned: usize,
    pub percent: f64,
}

impl AssignmentProgress {
    pub fn new(
        assignment: Assignment,
        image_set_name: impl Into<String>,
        clinician_username: impl Into<String>,
        evaluated: usize,
        assigned: usize,
    ) -> Self {
        let percent = if assigned == 0 {
            0.0
        } else {
            evaluated as f64 * 100.0 / assigned as f64
        };
        Self {
            assignment,
            image_set_name: image_set_name.into(),
            clinician_username: clinician_username.into(),
            evaluated,
            assigned,
            percent,
        }
    }

    pub fn remaining(&self) -> usize {
        self.assigned.saturating_sub(self.evaluated)
    }
}
