use chrono::{DateTime, Utc};
use sqlx::Row;

use bento_core::domain::profile::{
    ChoiceAction, DiningPurpose, GeoPoint, PreferenceRecord, ProfilePatch, RestaurantChoice,
    UserId, UserProfile,
};

use super::{ProfileRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn ensure_profile_row(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_profile (user_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(&user_id.0)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_profile(
    row: &sqlx::sqlite::SqliteRow,
    history: Vec<PreferenceRecord>,
) -> Result<UserProfile, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let display_name: String = row.try_get("display_name").map_err(decode)?;
    let dining_purpose: Option<String> = row.try_get("dining_purpose").map_err(decode)?;
    let food_preference: Option<String> = row.try_get("food_preference").map_err(decode)?;
    let awaiting: i64 = row.try_get("awaiting_food_preference").map_err(decode)?;
    let location_lat: Option<f64> = row.try_get("location_lat").map_err(decode)?;
    let location_lng: Option<f64> = row.try_get("location_lng").map_err(decode)?;
    let choice_place_id: Option<String> = row.try_get("last_choice_place_id").map_err(decode)?;
    let choice_action: Option<String> = row.try_get("last_choice_action").map_err(decode)?;
    let choice_at: Option<String> = row.try_get("last_choice_at").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    let location = match (location_lat, location_lng) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
        _ => None,
    };

    let last_restaurant_choice = match (choice_place_id, choice_action) {
        (Some(place_id), Some(action)) => {
            ChoiceAction::parse(&action).map(|action_type| RestaurantChoice {
                place_id,
                action_type,
                chosen_at: choice_at.as_deref().map(parse_timestamp).unwrap_or_else(Utc::now),
            })
        }
        _ => None,
    };

    Ok(UserProfile {
        user_id: UserId(user_id),
        display_name,
        dining_purpose: dining_purpose.as_deref().and_then(DiningPurpose::parse),
        food_preference,
        awaiting_food_preference: awaiting != 0,
        location,
        preference_history: history,
        last_restaurant_choice,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

#[async_trait::async_trait]
impl ProfileRepository for SqlProfileRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, dining_purpose, food_preference,
                    awaiting_food_preference, location_lat, location_lng,
                    last_choice_place_id, last_choice_action, last_choice_at,
                    created_at, updated_at
             FROM user_profile WHERE user_id = ?",
        )
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history_rows = sqlx::query(
            "SELECT preference, recorded_at FROM preference_history
             WHERE user_id = ? ORDER BY recorded_at, id",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await?;

        let history = history_rows
            .iter()
            .map(|record| {
                let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
                let preference: String = record.try_get("preference").map_err(decode)?;
                let recorded_at: String = record.try_get("recorded_at").map_err(decode)?;
                Ok(PreferenceRecord { preference, recorded_at: parse_timestamp(&recorded_at) })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(row_to_profile(&row, history)?))
    }

    async fn upsert(
        &self,
        user_id: &UserId,
        display_name: &str,
        patch: ProfilePatch,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let purpose = patch.dining_purpose.map(|p| p.as_str());
        let awaiting = patch.awaiting_food_preference.map(i64::from);
        let (latitude, longitude) = match patch.location {
            Some(point) => (Some(point.latitude), Some(point.longitude)),
            None => (None, None),
        };

        // One statement: the awaiting flag can never be observed apart from
        // the purpose/preference values it was patched with.
        sqlx::query(
            "INSERT INTO user_profile (
                 user_id, display_name, dining_purpose, food_preference,
                 awaiting_food_preference, location_lat, location_lng,
                 created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0), ?6, ?7, ?8, ?8)
             ON CONFLICT(user_id) DO UPDATE SET
                 display_name = COALESCE(NULLIF(excluded.display_name, ''), user_profile.display_name),
                 dining_purpose = COALESCE(excluded.dining_purpose, user_profile.dining_purpose),
                 food_preference = COALESCE(excluded.food_preference, user_profile.food_preference),
                 awaiting_food_preference = COALESCE(?5, user_profile.awaiting_food_preference),
                 location_lat = COALESCE(excluded.location_lat, user_profile.location_lat),
                 location_lng = COALESCE(excluded.location_lng, user_profile.location_lng),
                 updated_at = excluded.updated_at",
        )
        .bind(&user_id.0)
        .bind(display_name)
        .bind(purpose)
        .bind(&patch.food_preference)
        .bind(awaiting)
        .bind(latitude)
        .bind(longitude)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_preference(
        &self,
        user_id: &UserId,
        preference: &str,
    ) -> Result<(), RepositoryError> {
        self.ensure_profile_row(user_id).await?;

        sqlx::query(
            "INSERT INTO preference_history (user_id, preference, recorded_at)
             VALUES (?, ?, ?)",
        )
        .bind(&user_id.0)
        .bind(preference)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_choice(
        &self,
        user_id: &UserId,
        place_id: &str,
        action: ChoiceAction,
    ) -> Result<(), RepositoryError> {
        self.ensure_profile_row(user_id).await?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO restaurant_choices (user_id, place_id, action_type, chosen_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&user_id.0)
        .bind(place_id)
        .bind(action.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE user_profile
             SET last_choice_place_id = ?2, last_choice_action = ?3,
                 last_choice_at = ?4, updated_at = ?4
             WHERE user_id = ?1",
        )
        .bind(&user_id.0)
        .bind(place_id)
        .bind(action.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bento_core::domain::profile::{ChoiceAction, DiningPurpose, GeoPoint, ProfilePatch, UserId};

    use crate::repositories::{ProfileRepository, SqlProfileRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlProfileRepository {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProfileRepository::new(pool)
    }

    fn user() -> UserId {
        UserId("U-sql-1".to_owned())
    }

    #[tokio::test]
    async fn find_returns_none_for_unknown_user() {
        let repo = repository().await;
        let found = repo.find(&user()).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_creates_then_merges() {
        let repo = repository().await;
        let user = user();

        repo.upsert(&user, "小明", ProfilePatch::purpose_selected(DiningPurpose::Worker))
            .await
            .expect("first upsert");
        repo.upsert(
            &user,
            "小明",
            ProfilePatch::location_set(GeoPoint { latitude: 25.03, longitude: 121.56 }),
        )
        .await
        .expect("second upsert");

        let profile = repo.find(&user).await.expect("find").expect("profile exists");
        assert_eq!(profile.display_name, "小明");
        assert_eq!(profile.dining_purpose, Some(DiningPurpose::Worker));
        assert!(profile.awaiting_food_preference);
        assert!(profile.location.is_some());
        profile.validate().expect("merged profile stays consistent");
    }

    #[tokio::test]
    async fn preference_patch_clears_awaiting_flag_in_one_statement() {
        let repo = repository().await;
        let user = user();

        repo.upsert(&user, "小華", ProfilePatch::purpose_selected(DiningPurpose::Business))
            .await
            .expect("purpose upsert");
        repo.upsert(&user, "小華", ProfilePatch::preference_set("拉麵"))
            .await
            .expect("preference upsert");

        let profile = repo.find(&user).await.expect("find").expect("profile exists");
        assert_eq!(profile.food_preference.as_deref(), Some("拉麵"));
        assert!(!profile.awaiting_food_preference);
        assert_eq!(profile.dining_purpose, Some(DiningPurpose::Business));
    }

    #[tokio::test]
    async fn empty_display_name_does_not_clobber_existing() {
        let repo = repository().await;
        let user = user();

        repo.upsert(&user, "小美", ProfilePatch::purpose_selected(DiningPurpose::Worker))
            .await
            .expect("named upsert");
        repo.upsert(&user, "", ProfilePatch::preference_set("咖哩"))
            .await
            .expect("anonymous upsert");

        let profile = repo.find(&user).await.expect("find").expect("profile exists");
        assert_eq!(profile.display_name, "小美");
    }

    #[tokio::test]
    async fn preference_history_is_append_only_and_ordered() {
        let repo = repository().await;
        let user = user();

        repo.append_preference(&user, "拉麵").await.expect("append 1");
        repo.append_preference(&user, "泰式").await.expect("append 2");
        repo.append_preference(&user, "拉麵").await.expect("append 3");

        let profile = repo.find(&user).await.expect("find").expect("row ensured by append");
        let preferences: Vec<_> =
            profile.preference_history.iter().map(|r| r.preference.as_str()).collect();
        assert_eq!(preferences, vec!["拉麵", "泰式", "拉麵"]);
    }

    #[tokio::test]
    async fn choice_log_and_snapshot_stay_in_sync() {
        let repo = repository().await;
        let user = user();

        repo.record_choice(&user, "place-1", ChoiceAction::Navigate).await.expect("choice 1");
        repo.record_choice(&user, "place-2", ChoiceAction::UberEats).await.expect("choice 2");

        let profile = repo.find(&user).await.expect("find").expect("profile exists");
        let choice = profile.last_restaurant_choice.expect("snapshot recorded");
        assert_eq!(choice.place_id, "place-2");
        assert_eq!(choice.action_type, ChoiceAction::UberEats);
    }
}
