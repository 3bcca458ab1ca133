//! Base contract system

use mse_core::error::ValidationErrors;

pub use mse_core::traits::UserContext;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Base contract trait
pub trait Contract<T>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;

    /// Check if an attribute is writable
    fn is_writable(&self, _attribute: &str) -> bool {
        true
    }
}

/// Blank check shared by the contracts; adds "can't be blank" on failure
pub fn validate_present(field: &str, value: &str, errors: &mut ValidationErrors) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
        false
    } else {
        true
    }
}

/// Maximum length check counted in characters
pub fn validate_max_length(field: &str, value: &str, max: usize, errors: &mut ValidationErrors) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("is too long (maximum is {} characters)", max),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_present() {
        let mut errors = ValidationErrors::new();
        assert!(validate_present("title", "Dr.", &mut errors));
        assert!(!validate_present("workplace", "   ", &mut errors));
        assert_eq!(
            errors.get("workplace"),
            Some(&vec!["can't be blank".to_string()])
        );
    }

    #[test]
    fn test_validate_max_length_counts_chars() {
        let mut errors = ValidationErrors::new();
        validate_max_length("title", "Ärztin", 6, &mut errors);
        assert!(errors.is_empty());
        validate_max_length("title", "Ärztin!", 6, &mut errors);
        assert!(errors.has_error("title"));
    }
}
