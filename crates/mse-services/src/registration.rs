//! Invitations and invitation-gated registration

use mse_auth::{hash_password, PasswordError};
use mse_contracts::clinicians::{
    validate_email, validate_password, validate_username, RegistrationContract,
    DEFAULT_PASSWORD_MIN_LENGTH,
};
use mse_contracts::Contract;
use mse_core::{MseError, MseResult, ValidationErrors};
use mse_db::{RepositoryError, Stores};
use mse_models::{Clinician, Invitation, NewClinician, RegistrationForm};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const TOKEN_REQUIRED: &str = "Token is required";
pub const TOKEN_INVALID: &str = "Invalid or already used token";
pub const TOKEN_VALID: &str = "Valid invitation token";

/// Answer to a token check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCheck {
    pub valid: bool,
    pub message: &'static str,
}

impl TokenCheck {
    fn invalid(message: &'static str) -> Self {
        Self {
            valid: false,
            message,
        }
    }
}

fn hash_error(err: PasswordError) -> MseError {
    MseError::Internal(err.to_string())
}

/// Upper bound on invitations issued by one request
pub const MAX_INVITATIONS_PER_REQUEST: usize = 1000;

pub struct InvitationService {
    stores: Stores,
}

impl InvitationService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Check a token without consuming it
    pub async fn validate_token(&self, token: &str) -> MseResult<TokenCheck> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(TokenCheck::invalid(TOKEN_REQUIRED));
        }

        let Ok(token) = Uuid::parse_str(token) else {
            return Ok(TokenCheck::invalid(TOKEN_INVALID));
        };

        match self.stores.invitations.find_by_token(token).await? {
            Some(invitation) if !invitation.is_used => Ok(TokenCheck {
                valid: true,
                message: TOKEN_VALID,
            }),
            _ => Ok(TokenCheck::invalid(TOKEN_INVALID)),
        }
    }

    /// Issue `count` fresh invitations, at most [`MAX_INVITATIONS_PER_REQUEST`]
    #[instrument(skip(self))]
    pub async fn create(&self, count: usize) -> MseResult<Vec<Invitation>> {
        if !(1..=MAX_INVITATIONS_PER_REQUEST).contains(&count) {
            return Err(MseError::invalid(
                "count",
                format!("must be between 1 and {}", MAX_INVITATIONS_PER_REQUEST),
            ));
        }

        let mut created = Vec::new();
        for _ in 0..count {
            created.push(self.stores.invitations.create(Uuid::new_v4()).await?);
        }

        info!(count, "Invitations created");
        Ok(created)
    }

    pub async fn list(&self) -> MseResult<Vec<Invitation>> {
        Ok(self.stores.invitations.list().await?)
    }
}

pub struct RegistrationService {
    stores: Stores,
    contract: RegistrationContract,
    password_min_length: usize,
}

impl RegistrationService {
    pub fn new(stores: Stores) -> Self {
        Self::with_password_min_length(stores, DEFAULT_PASSWORD_MIN_LENGTH)
    }

    pub fn with_password_min_length(stores: Stores, password_min_length: usize) -> Self {
        Self {
            stores,
            contract: RegistrationContract::new(password_min_length),
            password_min_length,
        }
    }

    /// Create a clinician account, consuming the form's invitation token
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: RegistrationForm) -> MseResult<Clinician> {
        self.contract.validate(&form)?;

        let Ok(token) = Uuid::parse_str(form.token.trim()) else {
            return Err(MseError::invalid("token", TOKEN_INVALID));
        };

        let new = NewClinician {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            title: form.title.trim().to_string(),
            workplace: form.workplace.trim().to_string(),
            years_experience: form.years_experience.unwrap_or_default(),
            is_superuser: false,
            password_hash: hash_password(&form.password1).map_err(hash_error)?,
        };

        let redeemed = self
            .stores
            .invitations
            .redeem(token, new)
            .await
            .map_err(username_conflict)?;

        match redeemed {
            Some(clinician) => {
                info!(clinician_id = clinician.id, "Clinician registered");
                Ok(clinician)
            }
            None => {
                warn!("Registration with invalid or used token");
                Err(MseError::invalid("token", TOKEN_INVALID))
            }
        }
    }

    /// Create an administrator account without an invitation
    #[instrument(skip(self, params), fields(username = %params.username))]
    pub async fn create_superuser(&self, params: SuperuserParams) -> MseResult<Clinician> {
        let mut errors = ValidationErrors::new();
        validate_username(&params.username, &mut errors);
        validate_email(&params.email, &mut errors);
        validate_password(
            &params.password,
            &params.password,
            self.password_min_length,
            &mut errors,
        );
        errors.into_result()?;

        let new = NewClinician {
            username: params.username,
            email: params.email,
            first_name: String::new(),
            last_name: String::new(),
            title: String::new(),
            workplace: String::new(),
            years_experience: 0,
            is_superuser: true,
            password_hash: hash_password(&params.password).map_err(hash_error)?,
        };

        let clinician = self
            .stores
            .clinicians
            .create(new)
            .await
            .map_err(username_conflict)?;
        info!(clinician_id = clinician.id, "Superuser created");
        Ok(clinician)
    }
}

/// Input for [`RegistrationService::create_superuser`]
#[derive(Debug, Clone)]
pub struct SuperuserParams {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A taken username is reported on the form field
fn username_conflict(err: RepositoryError) -> MseError {
    match err {
        RepositoryError::Conflict(message) => MseError::invalid("username", message),
        other => other.into(),
    }
}
