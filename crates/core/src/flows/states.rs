use serde::{Deserialize, Serialize};

use crate::domain::profile::{DiningPurpose, GeoPoint, UserProfile};
use crate::intent::TurnResolution;

/// Explicit conversation phases. Derived from the profile rather than stored,
/// so the flags in storage can never disagree with the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    New,
    AwaitingPreference,
    AwaitingLocation,
    Ready,
}

impl ConversationState {
    pub fn from_profile(profile: &UserProfile) -> Self {
        if profile.dining_purpose.is_none() {
            return Self::New;
        }
        if profile.awaiting_food_preference || profile.food_preference.is_none() {
            return Self::AwaitingPreference;
        }
        if profile.location.is_none() {
            return Self::AwaitingLocation;
        }
        Self::Ready
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConversationEvent {
    Text(TurnResolution),
    Location(GeoPoint),
    PurposeSelected(DiningPurpose),
}

impl ConversationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Location(_) => "location",
            Self::PurposeSelected(_) => "purpose_selected",
        }
    }
}

/// Profile facts the transition function needs beyond the event itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowContext {
    pub purpose: Option<DiningPurpose>,
    pub preference: Option<String>,
    pub location: Option<GeoPoint>,
}

impl FlowContext {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            purpose: profile.dining_purpose,
            preference: profile.food_preference.clone(),
            location: profile.location,
        }
    }
}

/// Effect instructions produced by a transition, executed in order by the
/// orchestrator. Persistence effects precede reply effects so a crash after
/// the write never leaves the user ahead of the stored state.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnAction {
    SendGreeting,
    PromptPurposeSelection,
    SavePurpose { purpose: DiningPurpose },
    AskFoodPreference { purpose: DiningPurpose },
    SavePreference { preference: String },
    SavePurposeAndPreference { purpose: DiningPurpose, preference: String },
    SaveLocation { location: GeoPoint },
    AskLocation { preference: String },
    AcknowledgeLocation,
    RunSearch { purpose: DiningPurpose, keyword: String, location: GeoPoint },
    GenerateRecommendation { raw_text: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome {
    pub from: ConversationState,
    pub to: ConversationState,
    pub actions: Vec<TurnAction>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::ConversationState;
    use crate::domain::profile::{DiningPurpose, GeoPoint, ProfilePatch, UserId, UserProfile};

    fn profile() -> UserProfile {
        UserProfile::new(UserId("U-1".to_owned()), "小美", Utc::now())
    }

    #[test]
    fn state_is_derived_from_profile_fields() {
        let mut profile = profile();
        assert_eq!(ConversationState::from_profile(&profile), ConversationState::New);

        ProfilePatch::purpose_selected(DiningPurpose::Worker).apply_to(&mut profile, Utc::now());
        assert_eq!(
            ConversationState::from_profile(&profile),
            ConversationState::AwaitingPreference
        );

        ProfilePatch::preference_set("拉麵").apply_to(&mut profile, Utc::now());
        assert_eq!(ConversationState::from_profile(&profile), ConversationState::AwaitingLocation);

        ProfilePatch::location_set(GeoPoint { latitude: 25.0, longitude: 121.5 })
            .apply_to(&mut profile, Utc::now());
        assert_eq!(ConversationState::from_profile(&profile), ConversationState::Ready);
    }

    #[test]
    fn stale_preference_with_awaiting_flag_reads_as_awaiting() {
        let mut profile = profile();
        ProfilePatch::purpose_and_preference(DiningPurpose::Worker, "拉麵")
            .apply_to(&mut profile, Utc::now());
        // A later purpose re-selection re-arms the flag; the old preference
        // is stale until the next text message replaces it.
        ProfilePatch::purpose_selected(DiningPurpose::Business).apply_to(&mut profile, Utc::now());

        assert_eq!(
            ConversationState::from_profile(&profile),
            ConversationState::AwaitingPreference
        );
    }
}
