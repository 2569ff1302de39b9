use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use bento_core::domain::profile::{
    ChoiceAction, PreferenceRecord, ProfilePatch, RestaurantChoice, UserId, UserProfile,
};

use super::{ProfileRepository, RepositoryError};

/// Map-backed store for tests and local runs without a database file.
#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&user_id.0).cloned())
    }

    async fn upsert(
        &self,
        user_id: &UserId,
        display_name: &str,
        patch: ProfilePatch,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.0.clone())
            .or_insert_with(|| UserProfile::new(user_id.clone(), display_name, now));

        if !display_name.is_empty() {
            profile.display_name = display_name.to_owned();
        }
        patch.apply_to(profile, now);
        Ok(())
    }

    async fn append_preference(
        &self,
        user_id: &UserId,
        preference: &str,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.0.clone())
            .or_insert_with(|| UserProfile::new(user_id.clone(), "", now));

        profile
            .preference_history
            .push(PreferenceRecord { preference: preference.to_owned(), recorded_at: now });
        profile.updated_at = now;
        Ok(())
    }

    async fn record_choice(
        &self,
        user_id: &UserId,
        place_id: &str,
        action: ChoiceAction,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.0.clone())
            .or_insert_with(|| UserProfile::new(user_id.clone(), "", now));

        profile.last_restaurant_choice = Some(RestaurantChoice {
            place_id: place_id.to_owned(),
            action_type: action,
            chosen_at: now,
        });
        profile.updated_at = now;
        Ok(())
    }
}
