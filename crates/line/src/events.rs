use serde::Deserialize;

use bento_core::domain::profile::{ChoiceAction, DiningPurpose, GeoPoint};

/// Raw webhook envelope as delivered by the platform.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

impl WebhookBody {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Typed events; entries without a user identifier are dropped because
    /// nothing can be done with them.
    pub fn into_inbound_events(self) -> Vec<InboundEvent> {
        self.events.into_iter().filter_map(parse_event).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: Option<EventSource>,
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    pub message: Option<EventMessage>,
    pub postback: Option<EventPostback>,
}

#[derive(Debug, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct EventPostback {
    pub data: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    Text { user_id: String, reply_token: Option<String>, text: String },
    Location { user_id: String, reply_token: Option<String>, location: GeoPoint },
    Postback { user_id: String, reply_token: Option<String>, data: PostbackData },
    Unsupported { user_id: String, reply_token: Option<String>, event_type: String },
}

impl InboundEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Text { user_id, .. }
            | Self::Location { user_id, .. }
            | Self::Postback { user_id, .. }
            | Self::Unsupported { user_id, .. } => user_id,
        }
    }

    pub fn reply_token(&self) -> Option<&str> {
        match self {
            Self::Text { reply_token, .. }
            | Self::Location { reply_token, .. }
            | Self::Postback { reply_token, .. }
            | Self::Unsupported { reply_token, .. } => reply_token.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Location { .. } => "location",
            Self::Postback { .. } => "postback",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

/// Decoded `postback.data` query string.
#[derive(Clone, Debug, PartialEq)]
pub enum PostbackData {
    DiningPurpose { purpose: DiningPurpose },
    RestaurantChoice { action: ChoiceAction, place_id: String },
    Unknown { raw: String },
}

pub fn parse_postback_data(raw: &str) -> PostbackData {
    let mut action = None;
    let mut purpose = None;
    let mut place_id = None;

    for pair in raw.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "action" => action = Some(value),
            "purpose" => purpose = Some(value),
            "placeId" => place_id = Some(value),
            _ => {}
        }
    }

    match action {
        Some("diningPurpose") => match purpose.and_then(DiningPurpose::parse) {
            Some(purpose) => PostbackData::DiningPurpose { purpose },
            None => PostbackData::Unknown { raw: raw.to_owned() },
        },
        Some(choice) => match (ChoiceAction::parse(choice), place_id) {
            (Some(action), Some(place_id)) if !place_id.is_empty() => {
                PostbackData::RestaurantChoice { action, place_id: place_id.to_owned() }
            }
            _ => PostbackData::Unknown { raw: raw.to_owned() },
        },
        None => PostbackData::Unknown { raw: raw.to_owned() },
    }
}

fn parse_event(event: WebhookEvent) -> Option<InboundEvent> {
    let user_id = event.source.and_then(|source| source.user_id)?;
    let reply_token = event.reply_token;

    match event.event_type.as_str() {
        "message" => {
            let message = event.message?;
            match message.message_type.as_str() {
                "text" => Some(InboundEvent::Text {
                    user_id,
                    reply_token,
                    text: message.text.unwrap_or_default(),
                }),
                "location" => match (message.latitude, message.longitude) {
                    (Some(latitude), Some(longitude)) => Some(InboundEvent::Location {
                        user_id,
                        reply_token,
                        location: GeoPoint { latitude, longitude },
                    }),
                    _ => Some(InboundEvent::Unsupported {
                        user_id,
                        reply_token,
                        event_type: "message:location-without-coordinates".to_owned(),
                    }),
                },
                other => Some(InboundEvent::Unsupported {
                    user_id,
                    reply_token,
                    event_type: format!("message:{other}"),
                }),
            }
        }
        "postback" => {
            let postback = event.postback?;
            Some(InboundEvent::Postback {
                user_id,
                reply_token,
                data: parse_postback_data(&postback.data),
            })
        }
        other => Some(InboundEvent::Unsupported {
            user_id,
            reply_token,
            event_type: other.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use bento_core::domain::profile::{ChoiceAction, DiningPurpose};

    use super::{parse_postback_data, InboundEvent, PostbackData, WebhookBody};

    #[test]
    fn parses_text_message_event() {
        let body = r#"{
            "events": [{
                "type": "message",
                "replyToken": "rt-1",
                "source": {"userId": "U-1"},
                "message": {"type": "text", "text": "我想吃拉麵"}
            }]
        }"#
        .as_bytes();

        let events = WebhookBody::parse(body).expect("parse body").into_inbound_events();
        assert_eq!(
            events,
            vec![InboundEvent::Text {
                user_id: "U-1".to_owned(),
                reply_token: Some("rt-1".to_owned()),
                text: "我想吃拉麵".to_owned(),
            }]
        );
    }

    #[test]
    fn parses_location_message_event() {
        let body = br#"{
            "events": [{
                "type": "message",
                "replyToken": "rt-2",
                "source": {"userId": "U-2"},
                "message": {"type": "location", "latitude": 25.03, "longitude": 121.56}
            }]
        }"#;

        let events = WebhookBody::parse(body).expect("parse body").into_inbound_events();
        assert!(matches!(
            &events[0],
            InboundEvent::Location { location, .. }
                if (location.latitude - 25.03).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn sticker_message_is_reported_as_unsupported() {
        let body = br#"{
            "events": [{
                "type": "message",
                "replyToken": "rt-3",
                "source": {"userId": "U-3"},
                "message": {"type": "sticker"}
            }]
        }"#;

        let events = WebhookBody::parse(body).expect("parse body").into_inbound_events();
        assert!(matches!(
            &events[0],
            InboundEvent::Unsupported { event_type, .. } if event_type == "message:sticker"
        ));
    }

    #[test]
    fn event_without_user_id_is_dropped() {
        let body = br#"{
            "events": [{"type": "message", "message": {"type": "text", "text": "hi"}}]
        }"#;

        let events = WebhookBody::parse(body).expect("parse body").into_inbound_events();
        assert!(events.is_empty());
    }

    #[test]
    fn purpose_postback_data_parses() {
        assert_eq!(
            parse_postback_data("action=diningPurpose&purpose=worker"),
            PostbackData::DiningPurpose { purpose: DiningPurpose::Worker }
        );
        assert_eq!(
            parse_postback_data("action=diningPurpose&purpose=business"),
            PostbackData::DiningPurpose { purpose: DiningPurpose::Business }
        );
    }

    #[test]
    fn choice_postback_data_parses() {
        assert_eq!(
            parse_postback_data("action=uberEats&placeId=ChIJ123"),
            PostbackData::RestaurantChoice {
                action: ChoiceAction::UberEats,
                place_id: "ChIJ123".to_owned()
            }
        );
    }

    #[test]
    fn malformed_postback_data_falls_back_to_unknown() {
        for raw in
            ["action=diningPurpose&purpose=brunch", "action=navigate", "hello", "purpose=worker"]
        {
            assert!(
                matches!(parse_postback_data(raw), PostbackData::Unknown { .. }),
                "raw `{raw}` should be unknown"
            );
        }
    }
}
