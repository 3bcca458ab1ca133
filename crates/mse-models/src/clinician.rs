//! Clinician model
//!
//! Table: clinicians

use chrono::{DateTime, Utc};
use mse_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Clinician account
///
/// Every registered user is a clinician; administrators are clinicians
/// with `is_superuser` set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Clinician {
    pub id: Id,

    /// Login name (unique)
    pub username: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Professional title, e.g. "Dr."
    pub title: String,

    pub workplace: String,
    pub years_experience: i32,
    pub is_superuser: bool,

    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Clinician {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Clinician {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Clinician {
    const TABLE_NAME: &'static str = "clinicians";
    const TYPE_NAME: &'static str = "Clinician";
}

impl Clinician {
    /// First and last name joined, falling back to the username
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }

    /// Display name with the professional title, e.g. "Dr. Jane Doe"
    pub fn display_name(&self) -> String {
        if self.title.is_empty() {
            self.full_name()
        } else {
            format!("{} {}", self.title, self.full_name())
        }
    }
}

/// Data for inserting a clinician
#[derive(Debug, Clone)]
pub struct NewClinician {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub workplace: String,
    pub years_experience: i32,
    pub is_superuser: bool,
    pub password_hash: String,
}

/// Invitation-gated registration form
///
/// Missing fields deserialize as blank so the registration contract can
/// report them per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub token: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub workplace: String,
    pub years_experience: Option<i32>,
    pub password1: String,
    pub password2: String,
}

/// Partial profile edit; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub workplace: Option<String>,
    pub years_experience: Option<i32>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.title.is_none()
            && self.workplace.is_none()
            && self.years_experience.is_none()
    }

    /// Apply the present fields to a clinician in place
    pub fn apply_to(&self, clinician: &mut Clinician) {
        if let Some(email) = &self.email {
            clinician.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            clinician.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            clinician.last_name = last_name.clone();
        }
        if let Some(title) = &self.title {
            clinician.title = title.clone();
        }
        if let Some(workplace) = &self.workplace {
            clinician.workplace = workplace.clone();
        }
        if let Some(years) = self.years_experience {
            clinician.years_experience = years;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clinician() -> Clinician {
        let now = Utc::now();
        Clinician {
            id: 1,
            username: "doctor1".into(),
            email: "doctor1@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            title: "Dr.".into(),
            workplace: "General Hospital".into(),
            years_experience: 10,
            is_superuser: false,
            password_hash: "$argon2id$...".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_names() {
        let mut c = clinician();
        assert_eq!(c.full_name(), "Jane Doe");
        assert_eq!(c.display_name(), "Dr. Jane Doe");

        c.first_name.clear();
        c.last_name.clear();
        assert_eq!(c.full_name(), "doctor1");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(clinician()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "doctor1");
    }

    #[test]
    fn test_profile_update_apply() {
        let mut c = clinician();
        let update = ProfileUpdate {
            workplace: Some("City Clinic".into()),
            years_experience: Some(11),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut c);
        assert_eq!(c.workplace, "City Clinic");
        assert_eq!(c.years_experience, 11);
        assert_eq!(c.email, "doctor1@example.com");
    }
}
