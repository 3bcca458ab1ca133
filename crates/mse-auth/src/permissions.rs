//! Request-scoped identity

use mse_core::traits::{Id, UserContext};
use mse_models::Clinician;

/// The clinician making the current request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
}

impl CurrentUser {
    pub fn new(id: Id, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            is_superuser: false,
        }
    }

    /// Create an administrator
    pub fn superuser(id: Id, username: impl Into<String>, email: impl Into<String>) -> Self {
        let mut user = Self::new(id, username, email);
        user.is_superuser = true;
        user
    }
}

impl From<&Clinician> for CurrentUser {
    fn from(clinician: &Clinician) -> Self {
        Self {
            id: clinician.id,
            username: clinician.username.clone(),
            email: clinician.email.clone(),
            is_superuser: clinician.is_superuser,
        }
    }
}

impl UserContext for CurrentUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    fn is_anonymous(&self) -> bool {
        false
    }
}
