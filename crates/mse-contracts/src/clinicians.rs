//! Contracts for clinician registration and profile edits

use std::sync::LazyLock;

use mse_core::error::ValidationErrors;
use mse_models::{ProfileUpdate, RegistrationForm};
use regex::Regex;

use crate::base::{validate_max_length, validate_present, Contract, ValidationResult};

/// Valid email pattern
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Letters, digits and @/./+/-/_ only
static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

pub const USERNAME_MIN_LENGTH: usize = 2;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;

/// Profile fields shared by registration and profile edits
pub trait ProfileData: Send + Sync {
    fn email(&self) -> &str;
    fn first_name(&self) -> &str;
    fn last_name(&self) -> &str;
    fn title(&self) -> &str;
    fn workplace(&self) -> &str;
    fn years_experience(&self) -> Option<i32>;
}

/// Registration data: profile plus credentials and the invitation token
pub trait RegistrationData: ProfileData {
    fn token(&self) -> &str;
    fn username(&self) -> &str;
    fn password1(&self) -> &str;
    fn password2(&self) -> &str;
}

impl ProfileData for RegistrationForm {
    fn email(&self) -> &str {
        &self.email
    }
    fn first_name(&self) -> &str {
        &self.first_name
    }
    fn last_name(&self) -> &str {
        &self.last_name
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn workplace(&self) -> &str {
        &self.workplace
    }
    fn years_experience(&self) -> Option<i32> {
        self.years_experience
    }
}

impl RegistrationData for RegistrationForm {
    fn token(&self) -> &str {
        &self.token
    }
    fn username(&self) -> &str {
        &self.username
    }
    fn password1(&self) -> &str {
        &self.password1
    }
    fn password2(&self) -> &str {
        &self.password2
    }
}

pub fn validate_username(username: &str, errors: &mut ValidationErrors) {
    if !validate_present("username", username, errors) {
        return;
    }

    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH {
        errors.add(
            "username",
            format!("is too short (minimum is {} characters)", USERNAME_MIN_LENGTH),
        );
        return;
    }
    if length > USERNAME_MAX_LENGTH {
        validate_max_length("username", username, USERNAME_MAX_LENGTH, errors);
        return;
    }

    if !USERNAME_PATTERN.is_match(username) {
        errors.add(
            "username",
            "is invalid. Only letters, numbers, and @/./+/-/_ characters allowed",
        );
    }
}

pub fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if !validate_present("email", email, errors) {
        return;
    }

    if !EMAIL_PATTERN.is_match(email) {
        errors.add("email", "is not a valid email address");
    }
}

pub fn validate_years_experience(years: Option<i32>, errors: &mut ValidationErrors) {
    match years {
        None => errors.add("years_experience", "can't be blank"),
        Some(y) if y < 0 => errors.add("years_experience", "must be greater than or equal to 0"),
        Some(_) => {}
    }
}

/// Password strength and confirmation
///
/// Strength problems are reported on `password1`, a mismatch on `password2`.
pub fn validate_password(
    password1: &str,
    password2: &str,
    min_length: usize,
    errors: &mut ValidationErrors,
) {
    if password1.is_empty() {
        errors.add("password1", "can't be blank");
    } else {
        if password1.chars().count() < min_length {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    min_length
                ),
            );
        }
        if password1.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "This password is entirely numeric.");
        }
    }

    if password2.is_empty() {
        errors.add("password2", "can't be blank");
    } else if !password1.is_empty() && password1 != password2 {
        errors.add("password2", "The two password fields didn't match.");
    }
}

fn validate_profile<T: ProfileData + ?Sized>(entity: &T, errors: &mut ValidationErrors) {
    validate_email(entity.email(), errors);

    for (field, value) in [
        ("first_name", entity.first_name()),
        ("last_name", entity.last_name()),
        ("title", entity.title()),
        ("workplace", entity.workplace()),
    ] {
        if validate_present(field, value, errors) {
            validate_max_length(field, value, 150, errors);
        }
    }

    validate_years_experience(entity.years_experience(), errors);
}

/// Contract for invitation-gated registration
///
/// Only checks the shape of the token; whether it is unused is decided
/// atomically when it is consumed.
pub struct RegistrationContract {
    password_min_length: usize,
}

impl RegistrationContract {
    pub fn new(password_min_length: usize) -> Self {
        Self {
            password_min_length,
        }
    }
}

impl Default for RegistrationContract {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_MIN_LENGTH)
    }
}

impl<T: RegistrationData> Contract<T> for RegistrationContract {
    fn validate(&self, entity: &T) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_present("token", entity.token(), &mut errors);
        validate_username(entity.username(), &mut errors);
        validate_profile(entity, &mut errors);
        validate_password(
            entity.password1(),
            entity.password2(),
            self.password_min_length,
            &mut errors,
        );

        errors.into_result()
    }
}

/// Contract for a clinician editing their own profile
pub struct ProfileUpdateContract;

impl Contract<ProfileUpdate> for ProfileUpdateContract {
    fn validate(&self, entity: &ProfileUpdate) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if let Some(email) = &entity.email {
            validate_email(email, &mut errors);
        }

        for (field, value) in [
            ("first_name", &entity.first_name),
            ("last_name", &entity.last_name),
            ("title", &entity.title),
            ("workplace", &entity.workplace),
        ] {
            if let Some(value) = value {
                if validate_present(field, value, &mut errors) {
                    validate_max_length(field, value, 150, &mut errors);
                }
            }
        }

        if entity.years_experience.is_some() {
            validate_years_experience(entity.years_experience, &mut errors);
        }

        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        matches!(
            attribute,
            "email" | "first_name" | "last_name" | "title" | "workplace" | "years_experience"
        )
    }
}
