use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use bento_core::domain::place::RestaurantCandidate;
use bento_core::domain::profile::{DiningPurpose, PreferenceRecord};

use crate::llm::LlmClient;

/// Fixed reply when text generation is unavailable.
pub const GENERATION_APOLOGY: &str = "抱歉，我現在無法處理您的請求。請稍後再試。";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialIntentKind {
    Greeting,
    SetPurpose,
    SetPurposeAndPreference,
    NeedPurposeSelection,
}

/// Structured verdict of the first-turn classification. Only structurally
/// complete verdicts are produced; everything else becomes `None` upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct InitialIntent {
    pub kind: InitialIntentKind,
    pub dining_purpose: Option<DiningPurpose>,
    pub food_preference: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreferenceAnalysis {
    pub preferences: Vec<String>,
    pub suggestion: Option<String>,
}

/// Never-throwing facade over the language model: every operation has a
/// defined degraded answer so a provider outage can only dull replies,
/// never break the conversation.
#[derive(Clone)]
pub struct SuggestionClient {
    llm: Arc<dyn LlmClient>,
}

impl SuggestionClient {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Freeform generation with the fixed apology as the failure answer.
    pub async fn generate_text(&self, prompt: &str) -> String {
        match self.llm.complete(prompt).await {
            Ok(text) => text,
            Err(error) => {
                warn!(event_name = "suggestion.generate.failed", error = %error, "text generation failed");
                GENERATION_APOLOGY.to_owned()
            }
        }
    }

    /// Freeform generation where the caller prefers silence over an apology.
    pub async fn try_generate_text(&self, prompt: &str) -> Option<String> {
        match self.llm.complete(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(error) => {
                warn!(event_name = "suggestion.generate.failed", error = %error, "text generation failed");
                None
            }
        }
    }

    /// Promotional copy for one candidate; empty string on failure so the
    /// caller can substitute its own template.
    pub async fn describe_restaurant(
        &self,
        candidate: &RestaurantCandidate,
        keyword: &str,
    ) -> String {
        let rating = candidate
            .rating
            .map(|value| value.to_string())
            .unwrap_or_else(|| "無評分".to_owned());
        let walking = candidate
            .walking_minutes()
            .map(|minutes| format!("{minutes}分鐘"))
            .unwrap_or_else(|| "未提供".to_owned());
        let address = candidate.address.as_deref().unwrap_or("未提供");
        let delivery = if candidate.serves_delivery { "是" } else { "否" };

        let prompt = format!(
            "你是一個專業的餐廳推薦專家。根據以下餐廳信息，生成一個簡短、吸引人的描述（限制在100字以內）：\n\n\
             餐廳名稱：{name}\n評分：{rating}\n地址：{address}\n步行時間：{walking}\n提供外送：{delivery}\n\n\
             使用者喜好：{keyword}\n\n\
             請提供一個簡短的、吸引人的描述，重點強調餐廳的特色和與用戶喜好的匹配度。不要重複已有的數據，而是提供更多價值。\n\
             回覆必須是中文，風格要活潑但專業。",
            name = candidate.name,
        );

        match self.llm.complete(&prompt).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "suggestion.describe.failed",
                    restaurant = %candidate.name,
                    error = %error,
                    "restaurant description generation failed"
                );
                String::new()
            }
        }
    }

    /// First-turn classification. `None` covers transport failures,
    /// unparseable output, and structurally incomplete verdicts alike.
    pub async fn classify_intent(&self, text: &str) -> Option<InitialIntent> {
        let prompt = format!(
            "你是一個餐廳助理的意圖分類器。請分析使用者的第一句話並以JSON格式回覆：\n\
             {{\"intent\": \"...\", \"diningPurpose\": ..., \"foodPreference\": ...}}\n\n\
             intent 必須是以下其中之一：\n\
             - \"greeting\"：純打招呼，沒有提到用餐需求\n\
             - \"set_dining_purpose\"：表達了用餐類型（簡單午餐、小資午餐 → worker；跟客戶吃飯、商務聚餐 → business）\n\
             - \"set_dining_purpose_and_food_preference\"：同時表達了用餐類型和想吃的料理\n\
             - \"request_dining_purpose_selection\"：無法判斷\n\n\
             diningPurpose 必須是 \"worker\"、\"business\" 或 null。\n\
             foodPreference 是料理關鍵字字串或 null。\n\n\
             使用者的話：\"{text}\"\n\
             只返回JSON格式，不要包含其他文字。"
        );

        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(event_name = "suggestion.classify.failed", error = %error, "intent classification failed");
                return None;
            }
        };

        parse_intent_response(&raw)
    }

    /// Cuisine tendencies mined from the preference history; empty analysis
    /// when there is no history or the model answer is unusable.
    pub async fn analyze_preferences(&self, history: &[PreferenceRecord]) -> PreferenceAnalysis {
        if history.is_empty() {
            return PreferenceAnalysis::default();
        }

        let joined =
            history.iter().map(|record| record.preference.as_str()).collect::<Vec<_>>().join(", ");
        let prompt = format!(
            "分析以下用戶的餐飲偏好歷史，並提出推薦：\n\n歷史偏好：{joined}\n\n\
             請提供：\n1. 這個用戶可能喜歡的3種料理類型（按可能性排序）\n\
             2. 一個基於這些偏好的具體推薦（具體的一種料理）\n\n\
             以JSON格式回覆，格式如下：\n\
             {{\"preferredCuisines\": [\"類型1\", \"類型2\", \"類型3\"], \"recommendation\": \"具體推薦的料理\"}}\n\n\
             只返回JSON格式，不要包含其他文字。"
        );

        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(event_name = "suggestion.analyze.failed", error = %error, "preference analysis failed");
                return PreferenceAnalysis::default();
            }
        };

        parse_analysis_response(&raw)
    }
}

#[derive(Deserialize)]
struct IntentResponse {
    intent: Option<String>,
    #[serde(rename = "diningPurpose")]
    dining_purpose: Option<String>,
    #[serde(rename = "foodPreference")]
    food_preference: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    #[serde(rename = "preferredCuisines", default)]
    preferred_cuisines: Vec<String>,
    recommendation: Option<String>,
}

/// Model answers tend to wrap JSON in prose or code fences; take the
/// outermost brace pair.
fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn parse_intent_response(raw: &str) -> Option<InitialIntent> {
    let block = extract_json_block(raw)?;
    let response: IntentResponse = serde_json::from_str(block).ok()?;
    let dining_purpose = response.dining_purpose.as_deref().and_then(DiningPurpose::parse);
    let food_preference = response.food_preference.filter(|value| !value.trim().is_empty());

    let kind = match response.intent.as_deref()? {
        "greeting" => InitialIntentKind::Greeting,
        "set_dining_purpose" => InitialIntentKind::SetPurpose,
        "set_dining_purpose_and_food_preference" => InitialIntentKind::SetPurposeAndPreference,
        "request_dining_purpose_selection" => InitialIntentKind::NeedPurposeSelection,
        _ => return None,
    };

    // The verdict is authoritative only when the fields it declares exist.
    match kind {
        InitialIntentKind::SetPurpose if dining_purpose.is_none() => return None,
        InitialIntentKind::SetPurposeAndPreference
            if dining_purpose.is_none() || food_preference.is_none() =>
        {
            return None
        }
        _ => {}
    }

    Some(InitialIntent { kind, dining_purpose, food_preference })
}

fn parse_analysis_response(raw: &str) -> PreferenceAnalysis {
    let Some(block) = extract_json_block(raw) else {
        return PreferenceAnalysis::default();
    };
    match serde_json::from_str::<AnalysisResponse>(block) {
        Ok(response) => PreferenceAnalysis {
            preferences: response.preferred_cuisines,
            suggestion: response.recommendation.filter(|value| !value.trim().is_empty()),
        },
        Err(_) => PreferenceAnalysis::default(),
    }
}
