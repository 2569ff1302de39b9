use bento_core::domain::profile::UserProfile;
use bento_core::intent::{extract_food_keyword, is_recommendation_request, TurnResolution};

use crate::suggestion::{InitialIntent, InitialIntentKind, SuggestionClient};

/// Decides which conversation transition a text turn maps to. Pure over its
/// inputs apart from the first-turn model call; persistence belongs to the
/// orchestrator.
pub struct IntentResolver {
    suggestions: SuggestionClient,
}

impl IntentResolver {
    pub fn new(suggestions: SuggestionClient) -> Self {
        Self { suggestions }
    }

    pub async fn resolve(&self, profile: &UserProfile, text: &str) -> TurnResolution {
        // 1. No purpose yet: the model classifies, the fallback never guesses.
        if profile.dining_purpose.is_none() {
            let verdict = self.suggestions.classify_intent(text).await;
            return resolution_from_verdict(verdict);
        }

        // 2. Purpose known, cuisine pending: the whole message is the answer.
        if profile.awaiting_food_preference {
            return TurnResolution::ContinueExistingFlow {
                preference: extract_food_keyword(text),
            };
        }

        // 3. Recommendation phrasing skips the search pipeline.
        if is_recommendation_request(text) {
            return TurnResolution::RequestRecommendation { raw_text: text.to_owned() };
        }

        // 4. Anything else is a fresh search keyword.
        TurnResolution::NewSearch { keyword: extract_food_keyword(text) }
    }
}

fn resolution_from_verdict(verdict: Option<InitialIntent>) -> TurnResolution {
    let Some(verdict) = verdict else {
        return TurnResolution::NeedPurposeSelection;
    };

    match verdict.kind {
        InitialIntentKind::Greeting => TurnResolution::Greeting,
        InitialIntentKind::SetPurpose => match verdict.dining_purpose {
            Some(purpose) => TurnResolution::SetPurpose { purpose },
            None => TurnResolution::NeedPurposeSelection,
        },
        InitialIntentKind::SetPurposeAndPreference => {
            match (verdict.dining_purpose, verdict.food_preference) {
                (Some(purpose), Some(preference)) => {
                    TurnResolution::SetPurposeAndPreference { purpose, preference }
                }
                _ => TurnResolution::NeedPurposeSelection,
            }
        }
        InitialIntentKind::NeedPurposeSelection => TurnResolution::NeedPurposeSelection,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use bento_core::domain::profile::{DiningPurpose, ProfilePatch, UserId, UserProfile};
    use bento_core::intent::TurnResolution;

    use super::IntentResolver;
    use crate::llm::ScriptedLlmClient;
    use crate::suggestion::SuggestionClient;

    fn resolver(responses: Vec<Result<String, String>>) -> IntentResolver {
        IntentResolver::new(SuggestionClient::new(Arc::new(ScriptedLlmClient::with_responses(
            responses,
        ))))
    }

    fn fresh_profile() -> UserProfile {
        UserProfile::new(UserId("U-1".to_owned()), "小明", Utc::now())
    }

    fn profile_with_purpose(awaiting: bool) -> UserProfile {
        let mut profile = fresh_profile();
        if awaiting {
            ProfilePatch::purpose_selected(DiningPurpose::Worker)
                .apply_to(&mut profile, Utc::now());
        } else {
            ProfilePatch::purpose_and_preference(DiningPurpose::Worker, "拉麵")
                .apply_to(&mut profile, Utc::now());
        }
        profile
    }

    #[tokio::test]
    async fn first_turn_greeting_is_passed_through() {
        let resolver = resolver(vec![Ok(
            r#"{"intent": "greeting", "diningPurpose": null, "foodPreference": null}"#.to_owned(),
        )]);

        let resolution = resolver.resolve(&fresh_profile(), "哈囉").await;
        assert_eq!(resolution, TurnResolution::Greeting);
    }

    #[tokio::test]
    async fn first_turn_model_failure_falls_back_to_selection_prompt() {
        let resolver = resolver(vec![Err("provider down".to_owned())]);
        let resolution = resolver.resolve(&fresh_profile(), "hello").await;
        assert_eq!(resolution, TurnResolution::NeedPurposeSelection);
    }

    #[tokio::test]
    async fn first_turn_unparseable_answer_falls_back() {
        let resolver = resolver(vec![Ok("我不確定你想要什麼".to_owned())]);
        let resolution = resolver.resolve(&fresh_profile(), "嗯").await;
        assert_eq!(resolution, TurnResolution::NeedPurposeSelection);
    }

    #[tokio::test]
    async fn first_turn_combined_verdict_carries_both_fields() {
        let resolver = resolver(vec![Ok(
            r#"{"intent": "set_dining_purpose_and_food_preference", "diningPurpose": "business", "foodPreference": "日式"}"#
                .to_owned(),
        )]);

        let resolution = resolver.resolve(&fresh_profile(), "想跟客戶吃日式").await;
        assert_eq!(
            resolution,
            TurnResolution::SetPurposeAndPreference {
                purpose: DiningPurpose::Business,
                preference: "日式".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn awaiting_preference_consumes_whole_message_without_model_call() {
        let resolver = resolver(vec![]);
        let resolution = resolver.resolve(&profile_with_purpose(true), "我想吃拉麵").await;
        assert_eq!(
            resolution,
            TurnResolution::ContinueExistingFlow { preference: "拉麵".to_owned() }
        );
    }

    #[tokio::test]
    async fn awaiting_preference_wins_over_recommendation_trigger() {
        let resolver = resolver(vec![]);
        let resolution = resolver.resolve(&profile_with_purpose(true), "有推薦的嗎").await;
        assert!(matches!(resolution, TurnResolution::ContinueExistingFlow { .. }));
    }

    #[tokio::test]
    async fn recommendation_trigger_is_detected_when_flow_is_settled() {
        let resolver = resolver(vec![]);
        let resolution = resolver.resolve(&profile_with_purpose(false), "你覺得哪家好？").await;
        assert_eq!(
            resolution,
            TurnResolution::RequestRecommendation { raw_text: "你覺得哪家好？".to_owned() }
        );
    }

    #[tokio::test]
    async fn settled_flow_defaults_to_new_search_with_extracted_keyword() {
        let resolver = resolver(vec![]);
        let resolution = resolver.resolve(&profile_with_purpose(false), "我想吃泰式").await;
        assert_eq!(resolution, TurnResolution::NewSearch { keyword: "泰式".to_owned() });
    }
}
