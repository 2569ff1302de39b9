use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Coarse user segment driving the price band and selection policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiningPurpose {
    Worker,
    Business,
}

impl DiningPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Business => "business",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "worker" => Some(Self::Worker),
            "business" => Some(Self::Business),
            _ => None,
        }
    }

    /// Reply-facing segment label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Worker => "小資族午餐",
            Self::Business => "高級商業聚餐",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub preference: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChoiceAction {
    Navigate,
    UberEats,
    Foodpanda,
}

impl ChoiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::UberEats => "uberEats",
            Self::Foodpanda => "foodpanda",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "navigate" => Some(Self::Navigate),
            "uberEats" => Some(Self::UberEats),
            "foodpanda" => Some(Self::Foodpanda),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantChoice {
    pub place_id: String,
    pub action_type: ChoiceAction,
    pub chosen_at: DateTime<Utc>,
}

/// Accumulated conversation state for one messaging-platform user.
///
/// `awaiting_food_preference` is only meaningful while a dining purpose is
/// set; `validate` enforces that pairing. The preference history is
/// append-only and is never rewritten by profile merges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub dining_purpose: Option<DiningPurpose>,
    pub food_preference: Option<String>,
    pub awaiting_food_preference: bool,
    pub location: Option<GeoPoint>,
    pub preference_history: Vec<PreferenceRecord>,
    pub last_restaurant_choice: Option<RestaurantChoice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: UserId, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            dining_purpose: None,
            food_preference: None,
            awaiting_food_preference: false,
            location: None,
            preference_history: Vec::new(),
            last_restaurant_choice: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.awaiting_food_preference && self.dining_purpose.is_none() {
            return Err(DomainError::InvariantViolation(
                "awaiting_food_preference requires a dining purpose".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Merge patch for a profile upsert. Unset fields leave the stored value
/// untouched; the awaiting flag always travels with the field change that
/// justifies it so a profile can never be observed half-written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfilePatch {
    pub dining_purpose: Option<DiningPurpose>,
    pub food_preference: Option<String>,
    pub awaiting_food_preference: Option<bool>,
    pub location: Option<GeoPoint>,
}

impl ProfilePatch {
    /// Purpose chosen, cuisine still unknown.
    pub fn purpose_selected(purpose: DiningPurpose) -> Self {
        Self {
            dining_purpose: Some(purpose),
            awaiting_food_preference: Some(true),
            ..Self::default()
        }
    }

    /// Purpose and cuisine resolved in one turn.
    pub fn purpose_and_preference(purpose: DiningPurpose, preference: impl Into<String>) -> Self {
        Self {
            dining_purpose: Some(purpose),
            food_preference: Some(preference.into()),
            awaiting_food_preference: Some(false),
            ..Self::default()
        }
    }

    /// Cuisine resolved for an already-known purpose.
    pub fn preference_set(preference: impl Into<String>) -> Self {
        Self {
            food_preference: Some(preference.into()),
            awaiting_food_preference: Some(false),
            ..Self::default()
        }
    }

    pub fn location_set(location: GeoPoint) -> Self {
        Self { location: Some(location), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, profile: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(purpose) = self.dining_purpose {
            profile.dining_purpose = Some(purpose);
        }
        if let Some(preference) = &self.food_preference {
            profile.food_preference = Some(preference.clone());
        }
        if let Some(awaiting) = self.awaiting_food_preference {
            profile.awaiting_food_preference = awaiting;
        }
        if let Some(location) = self.location {
            profile.location = Some(location);
        }
        profile.updated_at = now;
    }
}
