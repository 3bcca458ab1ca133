//! Contract for creating assignments

use std::collections::HashSet;

use mse_core::error::ValidationErrors;
use mse_core::traits::Id;
use mse_models::NewAssignment;

use crate::base::{Contract, UserContext, ValidationResult};

/// Contract for an administrator assigning an image set to a clinician
///
/// `set_image_ids` are the ids of every image in the target set; a subset
/// must be drawn from them.
pub struct CreateAssignmentContract<'a, U: UserContext> {
    user: &'a U,
    set_image_ids: &'a HashSet<Id>,
}

impl<'a, U: UserContext> CreateAssignmentContract<'a, U> {
    pub fn new(user: &'a U, set_image_ids: &'a HashSet<Id>) -> Self {
        Self {
            user,
            set_image_ids,
        }
    }

    fn validate_user_allowed_to_assign(&self, errors: &mut ValidationErrors) {
        if !self.user.is_superuser() {
            errors.add_base("Only administrators can create assignments");
        }
    }

    fn validate_subset(&self, image_ids: &[Id], errors: &mut ValidationErrors) {
        if image_ids.is_empty() {
            return;
        }

        if self.set_image_ids.is_empty() {
            errors.add("image_ids", "the image set has no images");
            return;
        }

        let foreign: Vec<String> = image_ids
            .iter()
            .filter(|id| !self.set_image_ids.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if !foreign.is_empty() {
            errors.add(
                "image_ids",
                format!("do not belong to the image set: {}", foreign.join(", ")),
            );
        }
    }
}

impl<'a, U: UserContext> Contract<NewAssignment> for CreateAssignmentContract<'a, U> {
    fn validate(&self, entity: &NewAssignment) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        self.validate_user_allowed_to_assign(&mut errors);

        if entity.clinician_id <= 0 {
            errors.add("clinician_id", "can't be blank");
        }
        if entity.image_set_id <= 0 {
            errors.add("image_set_id", "can't be blank");
        }

        self.validate_subset(&entity.image_ids, &mut errors);

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockUserContext {
        superuser: bool,
    }

    impl UserContext for MockUserContext {
        fn user_id(&self) -> Id {
            1
        }
        fn is_superuser(&self) -> bool {
            self.superuser
        }
        fn is_anonymous(&self) -> bool {
            false
        }
    }

    fn new_assignment(image_ids: Vec<Id>) -> NewAssignment {
        NewAssignment {
            clinician_id: 2,
            image_set_id: 1,
            assigned_by_id: Some(1),
            image_ids,
        }
    }

    #[test]
    fn test_admin_can_assign_whole_set() {
        let ctx = MockUserContext { superuser: true };
        let ids: HashSet<Id> = [10, 11, 12].into_iter().collect();
        let contract = CreateAssignmentContract::new(&ctx, &ids);
        assert!(contract.validate(&new_assignment(vec![])).is_ok());
        assert!(contract.validate(&new_assignment(vec![10, 12])).is_ok());
    }

    #[test]
    fn test_non_admin_rejected() {
        let ctx = MockUserContext { superuser: false };
        let ids: HashSet<Id> = [10].into_iter().collect();
        let contract = CreateAssignmentContract::new(&ctx, &ids);
        let errors = contract.validate(&new_assignment(vec![])).unwrap_err();
        assert_eq!(
            errors.base,
            vec!["Only administrators can create assignments".to_string()]
        );
    }

    #[test]
    fn test_subset_must_belong_to_set() {
        let ctx = MockUserContext { superuser: true };
        let ids: HashSet<Id> = [10, 11].into_iter().collect();
        let contract = CreateAssignmentContract::new(&ctx, &ids);
        let errors = contract
            .validate(&new_assignment(vec![10, 99]))
            .unwrap_err();
        assert_eq!(
            errors.get("image_ids"),
            Some(&vec!["do not belong to the image set: 99".to_string()])
        );
    }
}
