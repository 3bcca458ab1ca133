//! Profile view and edit

use mse_auth::CurrentUser;
use mse_contracts::clinicians::ProfileUpdateContract;
use mse_contracts::Contract;
use mse_core::{MseResult, OptionExt};
use mse_db::Stores;
use mse_models::{Clinician, ProfileUpdate};
use tracing::info;

pub struct ProfileService {
    stores: Stores,
}

impl ProfileService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn get(&self, user: &CurrentUser) -> MseResult<Clinician> {
        self.stores
            .clinicians
            .find_by_id(user.id)
            .await?
            .or_not_found::<Clinician>(user.id)
    }

    /// Apply the present fields to the caller's own profile
    pub async fn update(&self, user: &CurrentUser, update: ProfileUpdate) -> MseResult<Clinician> {
        ProfileUpdateContract.validate(&update)?;

        if update.is_empty() {
            return self.get(user).await;
        }

        let update = ProfileUpdate {
            email: update.email.map(|s| s.trim().to_string()),
            first_name: update.first_name.map(|s| s.trim().to_string()),
            last_name: update.last_name.map(|s| s.trim().to_string()),
            title: update.title.map(|s| s.trim().to_string()),
            workplace: update.workplace.map(|s| s.trim().to_string()),
            years_experience: update.years_experience,
        };

        let clinician = self.stores.clinicians.update_profile(user.id, &update).await?;
        info!(clinician_id = clinician.id, "Profile updated");
        Ok(clinician)
    }
}
