use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bento_core::domain::profile::{DiningPurpose, GeoPoint, ProfilePatch, UserId, UserProfile};
use bento_core::errors::ApplicationError;
use bento_core::flows::{
    ConversationEvent, ConversationState, DiningFlow, FlowContext, FlowEngine, TurnAction,
};
use bento_db::repositories::{ProfileRepository, RepositoryError};
use bento_line::client::{ReplyClient, ReplyError};
use bento_line::messages::{
    purpose_selection_message, text_message, text_with_location_quick_reply, OutboundMessage,
};
use bento_line::{InboundEvent, PostbackData, ResponseComposer};
use bento_places::PlacesClient;

use crate::intent::IntentResolver;
use crate::llm::LlmClient;
use crate::pipeline::CandidateSelector;
use crate::suggestion::SuggestionClient;

const UNSUPPORTED_EVENT_REPLY: &str = "很抱歉，我只能處理文字訊息和位置訊息。";
const RECOMMENDATION_FALLBACK: &str = "很高興為您提供推薦！請告訴我您今天想吃什麼類型的料理呢？";

enum RawTurn {
    Text(String),
    Location(GeoPoint),
    Purpose(DiningPurpose),
}

/// Drives one inbound event through intent resolution, the conversation
/// state machine, and the selection pipeline, then delivers the replies.
pub struct ConversationRuntime {
    profiles: Arc<dyn ProfileRepository>,
    replies: Arc<dyn ReplyClient>,
    resolver: IntentResolver,
    selector: CandidateSelector,
    suggestions: SuggestionClient,
    composer: ResponseComposer,
    engine: FlowEngine<DiningFlow>,
}

impl ConversationRuntime {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        replies: Arc<dyn ReplyClient>,
        places: Arc<dyn PlacesClient>,
        llm: Arc<dyn LlmClient>,
        composer: ResponseComposer,
    ) -> Self {
        let suggestions = SuggestionClient::new(llm);
        Self {
            profiles,
            replies,
            resolver: IntentResolver::new(suggestions.clone()),
            selector: CandidateSelector::new(places, suggestions.clone()),
            suggestions,
            composer,
            engine: FlowEngine::default(),
        }
    }

    /// Transport-facing entry point: any failure is logged under the
    /// correlation id and answered with the user-safe apology, so one bad
    /// event can never break a webhook batch.
    pub async fn process(&self, event: InboundEvent, correlation_id: &str) {
        let user_id = UserId(event.user_id().to_owned());
        let reply_token = event.reply_token().map(str::to_owned);

        if let Err(error) = self.handle_event(event).await {
            let interface = error.into_interface(correlation_id);
            tracing::error!(
                event_name = "conversation.event_failed",
                user_id = %user_id.0,
                correlation_id,
                error = %interface,
                "event processing failed"
            );
            let apology = vec![text_message(interface.user_message())];
            if self.deliver(&user_id, reply_token.as_deref(), apology).await.is_err() {
                warn!(
                    event_name = "conversation.apology_undeliverable",
                    user_id = %user_id.0,
                    correlation_id,
                    "could not deliver failure apology"
                );
            }
        }
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<(), ApplicationError> {
        let user_id = UserId(event.user_id().to_owned());

        match event {
            InboundEvent::Text { reply_token, text, .. } => {
                self.process_turn(user_id, reply_token, RawTurn::Text(text)).await
            }
            InboundEvent::Location { reply_token, location, .. } => {
                self.process_turn(user_id, reply_token, RawTurn::Location(location)).await
            }
            InboundEvent::Postback { reply_token, data, .. } => match data {
                PostbackData::DiningPurpose { purpose } => {
                    self.process_turn(user_id, reply_token, RawTurn::Purpose(purpose)).await
                }
                PostbackData::RestaurantChoice { action, place_id } => {
                    // The user is being redirected by the card action; the
                    // choice is recorded and no reply is owed.
                    self.profiles
                        .record_choice(&user_id, &place_id, action)
                        .await
                        .map_err(persistence)?;
                    info!(
                        event_name = "conversation.choice_recorded",
                        user_id = %user_id.0,
                        place_id,
                        action = action.as_str(),
                        "restaurant choice recorded"
                    );
                    Ok(())
                }
                PostbackData::Unknown { raw } => {
                    warn!(
                        event_name = "conversation.postback_unknown",
                        user_id = %user_id.0,
                        raw,
                        "unrecognized postback payload"
                    );
                    self.deliver(
                        &user_id,
                        reply_token.as_deref(),
                        vec![text_message("抱歉，我無法處理這個請求。")],
                    )
                    .await
                }
            },
            InboundEvent::Unsupported { reply_token, event_type, .. } => {
                info!(
                    event_name = "conversation.event_unsupported",
                    user_id = %user_id.0,
                    event_type,
                    "ignoring unsupported event type"
                );
                self.deliver(
                    &user_id,
                    reply_token.as_deref(),
                    vec![text_message(UNSUPPORTED_EVENT_REPLY)],
                )
                .await
            }
        }
    }

    async fn process_turn(
        &self,
        user_id: UserId,
        reply_token: Option<String>,
        turn: RawTurn,
    ) -> Result<(), ApplicationError> {
        let fetched_name = self.replies.fetch_display_name(&user_id.0).await;
        let mut profile = self
            .profiles
            .find(&user_id)
            .await
            .map_err(persistence)?
            .unwrap_or_else(|| {
                UserProfile::new(
                    user_id.clone(),
                    fetched_name.clone().unwrap_or_default(),
                    Utc::now(),
                )
            });
        if let Some(name) = &fetched_name {
            if !name.is_empty() {
                profile.display_name = name.clone();
            }
        }

        let event = match turn {
            RawTurn::Text(text) => {
                ConversationEvent::Text(self.resolver.resolve(&profile, &text).await)
            }
            RawTurn::Location(location) => ConversationEvent::Location(location),
            RawTurn::Purpose(purpose) => ConversationEvent::PurposeSelected(purpose),
        };

        let state = ConversationState::from_profile(&profile);
        let context = FlowContext::from_profile(&profile);
        let outcome = match self.engine.apply(state, &event, &context) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "conversation.transition_rejected",
                    user_id = %user_id.0,
                    state = ?state,
                    error = %error,
                    "state machine rejected the event"
                );
                return self
                    .deliver(
                        &user_id,
                        reply_token.as_deref(),
                        vec![text_message("抱歉，我無法處理這個請求。")],
                    )
                    .await;
            }
        };

        info!(
            event_name = "conversation.transition_applied",
            user_id = %user_id.0,
            from = ?outcome.from,
            to = ?outcome.to,
            actions = outcome.actions.len(),
            "conversation transition applied"
        );

        self.execute(&profile, reply_token.as_deref(), outcome.actions).await
    }

    async fn execute(
        &self,
        profile: &UserProfile,
        reply_token: Option<&str>,
        actions: Vec<TurnAction>,
    ) -> Result<(), ApplicationError> {
        let user_id = &profile.user_id;
        let display_name = profile.display_name.clone();
        let nickname = if display_name.is_empty() {
            String::new()
        } else {
            format!("{display_name}，")
        };
        let greeting = if display_name.is_empty() {
            "您好！".to_owned()
        } else {
            format!("{display_name}，您好！")
        };

        let mut outbox: Vec<OutboundMessage> = Vec::new();
        let mut search: Option<(DiningPurpose, String, GeoPoint)> = None;
        let mut recommendation: Option<String> = None;

        for action in actions {
            match action {
                TurnAction::SavePurpose { purpose } => {
                    self.profiles
                        .upsert(user_id, &display_name, ProfilePatch::purpose_selected(purpose))
                        .await
                        .map_err(persistence)?;
                }
                TurnAction::SavePreference { preference } => {
                    self.profiles
                        .upsert(user_id, &display_name, ProfilePatch::preference_set(&preference))
                        .await
                        .map_err(persistence)?;
                    self.profiles
                        .append_preference(user_id, &preference)
                        .await
                        .map_err(persistence)?;
                }
                TurnAction::SavePurposeAndPreference { purpose, preference } => {
                    self.profiles
                        .upsert(
                            user_id,
                            &display_name,
                            ProfilePatch::purpose_and_preference(purpose, &preference),
                        )
                        .await
                        .map_err(persistence)?;
                    self.profiles
                        .append_preference(user_id, &preference)
                        .await
                        .map_err(persistence)?;
                }
                TurnAction::SaveLocation { location } => {
                    self.profiles
                        .upsert(user_id, &display_name, ProfilePatch::location_set(location))
                        .await
                        .map_err(persistence)?;
                }
                TurnAction::SendGreeting => {
                    outbox.push(text_message(format!(
                        "{greeting} 今天想吃點什麼呢？您可以直接告訴我您的用餐類型（像是「簡單午餐」或「跟客戶吃飯」），或想吃的料理喔！"
                    )));
                }
                TurnAction::PromptPurposeSelection => {
                    outbox.push(purpose_selection_message(format!(
                        "{greeting} 請問今天的用餐目的是什麼呢？或者可以直接告訴我想吃的料理類型喔！"
                    )));
                }
                TurnAction::AskFoodPreference { purpose } => {
                    outbox.push(text_message(format!(
                        "好的{nickname}了解您想找「{}」的地方！那今天想吃點什麼料理呢？（例如：飯類、麵食、日式、泰式等）",
                        purpose.label()
                    )));
                }
                TurnAction::AskLocation { preference } => {
                    outbox.push(text_with_location_quick_reply(format!(
                        "收到【{preference}】！為了幫您找到附近的餐廳，請分享您的目前位置。"
                    )));
                }
                TurnAction::AcknowledgeLocation => {
                    outbox.push(text_message(format!(
                        "好的，{nickname}我已記錄您的位置。今天想吃點什麼呢？例如：飯類、麵食、日式、泰式、或其他你想到的關鍵字？"
                    )));
                }
                TurnAction::RunSearch { purpose, keyword, location } => {
                    search = Some((purpose, keyword, location));
                }
                TurnAction::GenerateRecommendation { raw_text } => {
                    recommendation = Some(raw_text);
                }
            }
        }

        if let Some(raw_text) = recommendation {
            outbox.push(text_message(self.recommendation_text(profile, &raw_text).await));
        }

        if let Some((purpose, keyword, location)) = search {
            outbox.push(text_message(format!("收到！正在為您尋找附近的{keyword}...")));
            self.deliver(user_id, reply_token, outbox).await?;
            return self.run_search(user_id, purpose, &keyword, location).await;
        }

        self.deliver(user_id, reply_token, outbox).await
    }

    async fn run_search(
        &self,
        user_id: &UserId,
        purpose: DiningPurpose,
        keyword: &str,
        location: GeoPoint,
    ) -> Result<(), ApplicationError> {
        let candidates = self.selector.select(location, purpose, keyword).await;

        if candidates.is_empty() {
            return self
                .push(
                    user_id,
                    vec![text_message(format!(
                        "抱歉，在您附近找不到符合條件的{keyword}餐廳。"
                    ))],
                )
                .await;
        }

        let carousel = self.composer.carousel(&candidates, purpose, keyword);
        self.push(user_id, vec![carousel]).await?;

        let names =
            candidates.iter().map(|candidate| candidate.name.as_str()).collect::<Vec<_>>().join("、");
        let prompt = format!(
            "我剛剛幫用戶搜尋了{keyword}的餐廳，找到了這些餐廳：{names}。\n\
             請根據這些實際找到的餐廳，給用戶一些具體的推薦和建議，讓他們更好地選擇。\n\
             請在回覆中明確提及這些餐廳的名稱，並根據它們的特點給出建議。\n\n\
             重要排版要求：\n\
             1. 每介紹完一間餐廳後只換一行，不要空行\n\
             2. 整體排版要清晰易讀，避免長段落\n\
             3. 總字數控制在150字以內\n\n\
             建議應該簡短、活潑、友善，必須使用中文。"
        );

        // A missing follow-up is fine; the carousel already answered.
        if let Some(text) = self.suggestions.try_generate_text(&prompt).await {
            self.push(user_id, vec![text_message(text)]).await?;
        }

        Ok(())
    }

    async fn recommendation_text(&self, profile: &UserProfile, raw_text: &str) -> String {
        let analysis = self.suggestions.analyze_preferences(&profile.preference_history).await;

        let mut prompt = format!("使用者想要關於餐廳的推薦。他問的問題是: \"{raw_text}\"。");
        if !analysis.preferences.is_empty() {
            prompt.push_str(&format!(
                "根據他過去的搜尋紀錄，他可能喜歡這些類型的料理: {}。",
                analysis.preferences.join(", ")
            ));
        }
        if let Some(suggestion) = &analysis.suggestion {
            prompt.push_str(&format!("你可以考慮推薦他: {suggestion}，或類似的食物。"));
        }
        prompt.push_str("請給予簡短、活潑且有用的餐飲建議。回覆必須是中文，不要超過100字。");

        self.suggestions
            .try_generate_text(&prompt)
            .await
            .unwrap_or_else(|| RECOMMENDATION_FALLBACK.to_owned())
    }

    async fn deliver(
        &self,
        user_id: &UserId,
        reply_token: Option<&str>,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ApplicationError> {
        if messages.is_empty() {
            return Ok(());
        }

        let sent = match reply_token {
            Some(token) => self.replies.reply(token, messages).await,
            None => self.replies.push(&user_id.0, messages).await,
        };
        sent.map_err(integration)
    }

    async fn push(
        &self,
        user_id: &UserId,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ApplicationError> {
        self.replies.push(&user_id.0, messages).await.map_err(integration)
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn integration(error: ReplyError) -> ApplicationError {
    ApplicationError::Integration(error.to_string())
}
