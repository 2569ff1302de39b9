use url::Url;

use bento_core::domain::place::RestaurantCandidate;
use bento_core::domain::profile::DiningPurpose;

use crate::messages::{
    Action, CarouselColumn, OutboundMessage, Template, MAX_ACTIONS_PER_CARD, MAX_CAROUSEL_COLUMNS,
};

/// LINE truncates template titles and bodies; stay under its limits.
const MAX_TITLE_CHARS: usize = 40;
const MAX_BODY_CHARS: usize = 60;

const PLACEHOLDER_PHOTO_URL: &str = "https://via.placeholder.com/400x200?text=No+Image";

/// Renders the selected candidates into the reply carousel.
pub struct ResponseComposer {
    photo_base_url: String,
    photo_api_key: String,
}

impl ResponseComposer {
    pub fn new(photo_base_url: impl Into<String>, photo_api_key: impl Into<String>) -> Self {
        Self {
            photo_base_url: photo_base_url.into(),
            photo_api_key: photo_api_key.into(),
        }
    }

    pub fn carousel(
        &self,
        candidates: &[RestaurantCandidate],
        purpose: DiningPurpose,
        keyword: &str,
    ) -> OutboundMessage {
        let columns = candidates
            .iter()
            .take(MAX_CAROUSEL_COLUMNS)
            .map(|candidate| self.column(candidate, purpose, keyword))
            .collect();

        OutboundMessage::Template {
            alt_text: "為您找到的餐廳".to_owned(),
            template: Template::Carousel { columns },
        }
    }

    fn column(
        &self,
        candidate: &RestaurantCandidate,
        purpose: DiningPurpose,
        keyword: &str,
    ) -> CarouselColumn {
        let mut body = String::new();
        if purpose == DiningPurpose::Worker {
            if let Some(minutes) = candidate.walking_minutes() {
                body.push_str(&format!("🚶 步行約 {minutes} 分鐘\n"));
            }
        }
        match candidate.rating {
            Some(rating) => {
                body.push_str(&format!("⭐ {rating} ({}則評論)", candidate.rating_count))
            }
            None => body.push_str("尚未有評分"),
        }
        body.push('\n');
        match &candidate.description {
            Some(description) if !description.is_empty() => body.push_str(description),
            _ => body.push_str(&format!("推薦您品嚐這家{keyword}餐廳！")),
        }

        CarouselColumn {
            thumbnail_image_url: self.photo_url(candidate),
            title: truncate_chars(&candidate.name, MAX_TITLE_CHARS),
            text: truncate_chars(&body, MAX_BODY_CHARS),
            actions: card_actions(candidate),
        }
    }

    fn photo_url(&self, candidate: &RestaurantCandidate) -> String {
        let Some(reference) = &candidate.photo_reference else {
            return PLACEHOLDER_PHOTO_URL.to_owned();
        };

        let base = format!("{}/maps/api/place/photo", self.photo_base_url.trim_end_matches('/'));
        match Url::parse_with_params(
            &base,
            [
                ("maxwidth", "400"),
                ("photoreference", reference.as_str()),
                ("key", self.photo_api_key.as_str()),
            ],
        ) {
            Ok(url) => url.into(),
            Err(_) => PLACEHOLDER_PHOTO_URL.to_owned(),
        }
    }
}

fn card_actions(candidate: &RestaurantCandidate) -> Vec<Action> {
    let mut actions = vec![Action::Uri {
        label: "🗺️ Google導航".to_owned(),
        uri: navigation_url(candidate),
    }];

    if candidate.serves_delivery {
        if let Some(uri) = search_url("https://www.ubereats.com/search", &candidate.name) {
            actions.push(Action::Uri { label: "🛵 UberEats叫餐".to_owned(), uri });
        }
        if actions.len() < MAX_ACTIONS_PER_CARD {
            if let Some(uri) = search_url("https://www.foodpanda.com.tw/search", &candidate.name) {
                actions.push(Action::Uri { label: "🐼 Foodpanda叫餐".to_owned(), uri });
            }
        }
    }

    actions.truncate(MAX_ACTIONS_PER_CARD);
    actions
}

fn navigation_url(candidate: &RestaurantCandidate) -> String {
    let destination =
        format!("{},{}", candidate.location.latitude, candidate.location.longitude);
    match Url::parse_with_params(
        "https://www.google.com/maps/dir/",
        [("api", "1"), ("destination", destination.as_str()), ("travelmode", "walking")],
    ) {
        Ok(url) => url.into(),
        Err(_) => format!("https://www.google.com/maps/dir/?api=1&destination={destination}"),
    }
}

fn search_url(base: &str, query: &str) -> Option<String> {
    Url::parse_with_params(base, [("q", query)]).ok().map(Url::into)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use bento_core::domain::place::RestaurantCandidate;
    use bento_core::domain::profile::{DiningPurpose, GeoPoint};

    use super::{truncate_chars, ResponseComposer, MAX_ACTIONS_PER_CARD};
    use crate::messages::{Action, OutboundMessage, Template};

    fn composer() -> ResponseComposer {
        ResponseComposer::new("https://maps.googleapis.com", "maps-key")
    }

    fn candidate() -> RestaurantCandidate {
        RestaurantCandidate {
            place_id: "p-1".to_owned(),
            name: "老王牛肉麵".to_owned(),
            location: GeoPoint { latitude: 25.04, longitude: 121.53 },
            rating: Some(4.6),
            rating_count: 812,
            price_level: Some(1),
            address: Some("台北市中正區".to_owned()),
            photo_reference: Some("ref-1".to_owned()),
            serves_delivery: false,
            walking_duration_secs: Some(420),
            description: Some("湯頭濃郁的人氣小店".to_owned()),
        }
    }

    fn columns(message: &OutboundMessage) -> &[crate::messages::CarouselColumn] {
        match message {
            OutboundMessage::Template { template: Template::Carousel { columns }, .. } => columns,
            other => panic!("expected carousel template, got {other:?}"),
        }
    }

    #[test]
    fn worker_card_shows_walking_time_and_rating() {
        let message = composer().carousel(&[candidate()], DiningPurpose::Worker, "牛肉麵");
        let columns = columns(&message);

        assert_eq!(columns.len(), 1);
        assert!(columns[0].text.starts_with("🚶 步行約 7 分鐘\n"));
        assert!(columns[0].text.contains("⭐ 4.6 (812則評論)"));
    }

    #[test]
    fn business_card_omits_walking_line() {
        let message = composer().carousel(&[candidate()], DiningPurpose::Business, "牛肉麵");
        let columns = columns(&message);
        assert!(!columns[0].text.contains("步行"));
    }

    #[test]
    fn unrated_candidate_says_so() {
        let unrated = RestaurantCandidate { rating: None, ..candidate() };
        let message = composer().carousel(&[unrated], DiningPurpose::Business, "牛肉麵");
        assert!(columns(&message)[0].text.contains("尚未有評分"));
    }

    #[test]
    fn missing_description_falls_back_to_keyword_template() {
        let bare = RestaurantCandidate { description: None, ..candidate() };
        let message = composer().carousel(&[bare], DiningPurpose::Business, "牛肉麵");
        assert!(columns(&message)[0].text.contains("推薦您品嚐這家牛肉麵餐廳！"));
    }

    #[test]
    fn title_and_body_are_capped() {
        let long = RestaurantCandidate {
            name: "超".repeat(80),
            description: Some("讚".repeat(120)),
            ..candidate()
        };
        let message = composer().carousel(&[long], DiningPurpose::Worker, "麵");
        let column = &columns(&message)[0];

        assert_eq!(column.title.chars().count(), 40);
        assert!(column.text.chars().count() <= 60);
    }

    #[test]
    fn navigation_action_is_always_first() {
        let message = composer().carousel(&[candidate()], DiningPurpose::Worker, "牛肉麵");
        let actions = &columns(&message)[0].actions;

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::Uri { label, uri }
                if label == "🗺️ Google導航"
                    && uri.contains("destination=25.04%2C121.53")
                    && uri.contains("travelmode=walking")
        ));
    }

    #[test]
    fn delivery_candidate_gets_both_providers_within_action_cap() {
        let delivering = RestaurantCandidate { serves_delivery: true, ..candidate() };
        let message = composer().carousel(&[delivering], DiningPurpose::Worker, "牛肉麵");
        let actions = &columns(&message)[0].actions;

        assert_eq!(actions.len(), 3);
        assert!(actions.len() <= MAX_ACTIONS_PER_CARD);
        assert!(matches!(&actions[1], Action::Uri { label, uri }
            if label.contains("UberEats") && uri.contains("ubereats.com")));
        assert!(matches!(&actions[2], Action::Uri { label, uri }
            if label.contains("Foodpanda") && uri.contains("foodpanda.com.tw")));
    }

    #[test]
    fn photo_url_embeds_reference_and_falls_back_without_one() {
        let message = composer().carousel(&[candidate()], DiningPurpose::Worker, "牛肉麵");
        assert!(columns(&message)[0].thumbnail_image_url.contains("photoreference=ref-1"));

        let bare = RestaurantCandidate { photo_reference: None, ..candidate() };
        let message = composer().carousel(&[bare], DiningPurpose::Worker, "牛肉麵");
        assert!(columns(&message)[0].thumbnail_image_url.contains("placeholder"));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("牛肉麵好吃", 3), "牛肉麵");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}
