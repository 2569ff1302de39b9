use crate::domain::profile::DiningPurpose;

/// Colloquial "I want to eat ..." prefixes. Within each family the specific
/// form precedes the generic one, and the bare 想要/要 forms come last so a
/// phrase like 我想要吃X still strips down to X via 要吃.
const FOOD_PREFIXES: &[&str] = &[
    "我想吃", "想吃", "我要吃", "要吃", "我喜歡", "喜歡吃", "我愛", "愛吃", "我想來", "想來",
    "我要來", "要來", "我想點", "想點", "我要點", "要點", "我想要", "想要",
];

const RECOMMENDATION_TRIGGERS: &[&str] = &["推薦", "建議", "你覺得"];

/// The Intent Resolver's verdict for one text turn.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnResolution {
    Greeting,
    SetPurpose { purpose: DiningPurpose },
    SetPurposeAndPreference { purpose: DiningPurpose, preference: String },
    NeedPurposeSelection,
    ContinueExistingFlow { preference: String },
    RequestRecommendation { raw_text: String },
    NewSearch { keyword: String },
}

/// Strips the first matching "I want to eat" prefix and returns the trimmed
/// remainder; text without a recognized prefix passes through unchanged, so
/// the function is idempotent on its own output.
pub fn extract_food_keyword(text: &str) -> String {
    let trimmed = text.trim();
    for prefix in FOOD_PREFIXES {
        if let Some(position) = trimmed.find(prefix) {
            let keyword = trimmed[position + prefix.len()..].trim();
            if !keyword.is_empty() {
                return keyword.to_owned();
            }
        }
    }
    trimmed.to_owned()
}

pub fn is_recommendation_request(text: &str) -> bool {
    RECOMMENDATION_TRIGGERS.iter().any(|trigger| text.contains(trigger))
}

#[cfg(test)]
mod tests {
    use super::{extract_food_keyword, is_recommendation_request};

    #[test]
    fn strips_leading_craving_prefix() {
        assert_eq!(extract_food_keyword("我想吃拉麵"), "拉麵");
        assert_eq!(extract_food_keyword("想吃 泰式料理"), "泰式料理");
        assert_eq!(extract_food_keyword("我要點牛肉麵"), "牛肉麵");
    }

    #[test]
    fn strips_prefix_found_mid_sentence() {
        assert_eq!(extract_food_keyword("今天我想吃咖哩"), "咖哩");
    }

    #[test]
    fn specific_prefix_wins_over_its_suffix_form() {
        // "我想吃" must match before "想吃" would, otherwise "我" leaks in.
        assert_eq!(extract_food_keyword("我想吃壽司"), "壽司");
        // 我想要吃X resolves through 要吃, not the generic 想要.
        assert_eq!(extract_food_keyword("我想要吃一碗熱湯麵"), "一碗熱湯麵");
    }

    #[test]
    fn text_without_prefix_passes_through() {
        assert_eq!(extract_food_keyword("拉麵"), "拉麵");
        assert_eq!(extract_food_keyword("  日式燒肉  "), "日式燒肉");
    }

    #[test]
    fn prefix_with_empty_remainder_passes_through() {
        assert_eq!(extract_food_keyword("想吃"), "想吃");
    }

    #[test]
    fn extraction_is_idempotent_on_its_output() {
        for text in ["我想要吃一碗熱湯麵", "我喜歡泰式", "咖哩飯"] {
            let once = extract_food_keyword(text);
            let twice = extract_food_keyword(&once);
            assert_eq!(once, twice, "input {text}");
        }
    }

    #[test]
    fn recommendation_triggers_match_anywhere() {
        assert!(is_recommendation_request("有什麼推薦的嗎"));
        assert!(is_recommendation_request("給點建議"));
        assert!(is_recommendation_request("你覺得哪家好？"));
        assert!(!is_recommendation_request("拉麵"));
    }
}
