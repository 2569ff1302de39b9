use serde::Serialize;

/// LINE caps template cards at four actions and carousels at ten columns.
pub const MAX_ACTIONS_PER_CARD: usize = 4;
pub const MAX_CAROUSEL_COLUMNS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
        #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    #[serde(rename_all = "camelCase")]
    Template { alt_text: String, template: Template },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub action: Action,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Location { label: String },
    Postback { label: String, data: String },
    Uri { label: String, uri: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Template {
    Buttons { title: String, text: String, actions: Vec<Action> },
    Carousel { columns: Vec<CarouselColumn> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselColumn {
    pub thumbnail_image_url: String,
    pub title: String,
    pub text: String,
    pub actions: Vec<Action>,
}

pub fn text_message(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Text { text: text.into(), quick_reply: None }
}

/// Text message carrying the share-location quick reply button.
pub fn text_with_location_quick_reply(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Text {
        text: text.into(),
        quick_reply: Some(QuickReply {
            items: vec![QuickReplyItem {
                item_type: "action",
                action: Action::Location { label: "分享位置".to_owned() },
            }],
        }),
    }
}

/// The two-way purpose choice presented whenever the purpose is unknown.
pub fn purpose_selection_message(greeting: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Template {
        alt_text: "請選擇您的用餐目的".to_owned(),
        template: Template::Buttons {
            title: "上班吃什麼？".to_owned(),
            text: greeting.into(),
            actions: vec![
                Action::Postback {
                    label: "🍱 小資族午餐".to_owned(),
                    data: "action=diningPurpose&purpose=worker".to_owned(),
                },
                Action::Postback {
                    label: "🍽️ 高級商業聚餐".to_owned(),
                    data: "action=diningPurpose&purpose=business".to_owned(),
                },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{purpose_selection_message, text_message, text_with_location_quick_reply};

    #[test]
    fn text_message_serializes_to_platform_shape() {
        let value = serde_json::to_value(text_message("您好！")).expect("serialize");
        assert_eq!(value, json!({"type": "text", "text": "您好！"}));
    }

    #[test]
    fn quick_reply_carries_location_action() {
        let value =
            serde_json::to_value(text_with_location_quick_reply("請分享位置")).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "text",
                "text": "請分享位置",
                "quickReply": {
                    "items": [
                        {"type": "action", "action": {"type": "location", "label": "分享位置"}}
                    ]
                }
            })
        );
    }

    #[test]
    fn purpose_selection_has_exactly_two_postback_choices() {
        let value = serde_json::to_value(purpose_selection_message("您好！請問今天的用餐目的是什麼呢？"))
            .expect("serialize");

        assert_eq!(value["type"], "template");
        assert_eq!(value["altText"], "請選擇您的用餐目的");
        let actions = value["template"]["actions"].as_array().expect("actions array");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["data"], "action=diningPurpose&purpose=worker");
        assert_eq!(actions[1]["data"], "action=diningPurpose&purpose=business");
    }
}
