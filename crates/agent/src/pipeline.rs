use std::sync::Arc;

use tracing::{debug, info};

use bento_core::domain::place::RestaurantCandidate;
use bento_core::domain::profile::{DiningPurpose, GeoPoint};
use bento_core::selection::{
    price_band, select_business, select_worker, worker_shortlist, SEARCH_RADIUS_METERS,
};
use bento_places::{PlaceDetails, PlacesClient};

use crate::suggestion::SuggestionClient;

/// Runs the nearby-search → filter → rank → enrich pipeline. Provider and
/// model failures are absorbed per candidate; the only empty result is a
/// genuinely empty search.
pub struct CandidateSelector {
    places: Arc<dyn PlacesClient>,
    suggestions: SuggestionClient,
}

impl CandidateSelector {
    pub fn new(places: Arc<dyn PlacesClient>, suggestions: SuggestionClient) -> Self {
        Self { places, suggestions }
    }

    pub async fn select(
        &self,
        location: GeoPoint,
        purpose: DiningPurpose,
        keyword: &str,
    ) -> Vec<RestaurantCandidate> {
        let band = price_band(purpose);
        let found = self
            .places
            .nearby_search(location, keyword, SEARCH_RADIUS_METERS, band)
            .await;
        info!(
            event_name = "pipeline.nearby_search.completed",
            keyword,
            purpose = purpose.as_str(),
            found = found.len(),
            "nearby search completed"
        );

        if found.is_empty() {
            return Vec::new();
        }

        let selected = match purpose {
            DiningPurpose::Worker => {
                let shortlist = worker_shortlist(found);
                let destinations: Vec<GeoPoint> =
                    shortlist.iter().map(|candidate| candidate.location).collect();
                let durations = self.places.walking_durations(location, &destinations).await;

                let annotated = shortlist
                    .into_iter()
                    .zip(durations)
                    .map(|(candidate, duration)| RestaurantCandidate {
                        walking_duration_secs: duration,
                        ..candidate
                    })
                    .collect();
                select_worker(annotated)
            }
            DiningPurpose::Business => select_business(found),
        };

        let mut enriched = Vec::with_capacity(selected.len());
        for candidate in selected {
            let candidate = self.enrich(candidate, keyword).await;
            enriched.push(candidate);
        }
        enriched
    }

    /// Detail fetch then description, each with a per-candidate fallback.
    async fn enrich(
        &self,
        mut candidate: RestaurantCandidate,
        keyword: &str,
    ) -> RestaurantCandidate {
        match self.places.place_details(&candidate.place_id).await {
            Some(details) => merge_details(&mut candidate, details),
            None => debug!(
                event_name = "pipeline.details.fallback",
                place_id = %candidate.place_id,
                "place details unavailable, keeping search fields"
            ),
        }

        let description = self.suggestions.describe_restaurant(&candidate, keyword).await;
        candidate.description = Some(if description.trim().is_empty() {
            format!("推薦您品嚐這家{keyword}餐廳！")
        } else {
            description
        });

        candidate
    }
}

fn merge_details(candidate: &mut RestaurantCandidate, details: PlaceDetails) {
    if let Some(name) = details.name {
        candidate.name = name;
    }
    if details.address.is_some() {
        candidate.address = details.address;
    }
    if details.rating.is_some() {
        candidate.rating = details.rating;
    }
    if let Some(rating_count) = details.rating_count {
        candidate.rating_count = rating_count;
    }
    if details.photo_reference.is_some() {
        candidate.photo_reference = details.photo_reference;
    }
    candidate.serves_delivery = candidate.serves_delivery || details.serves_delivery;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bento_core::domain::place::RestaurantCandidate;
    use bento_core::domain::profile::{DiningPurpose, GeoPoint};
    use bento_places::{PlaceDetails, StaticPlacesClient};

    use super::CandidateSelector;
    use crate::llm::ScriptedLlmClient;
    use crate::suggestion::SuggestionClient;

    fn origin() -> GeoPoint {
        GeoPoint { latitude: 25.03, longitude: 121.56 }
    }

    fn candidate(place_id: &str, rating: f64) -> RestaurantCandidate {
        RestaurantCandidate {
            place_id: place_id.to_owned(),
            name: format!("餐廳{place_id}"),
            location: origin(),
            rating: Some(rating),
            rating_count: 50,
            price_level: Some(1),
            address: Some("台北市".to_owned()),
            photo_reference: None,
            serves_delivery: false,
            walking_duration_secs: None,
            description: None,
        }
    }

    fn selector(
        places: StaticPlacesClient,
        responses: Vec<Result<String, String>>,
    ) -> CandidateSelector {
        CandidateSelector::new(
            Arc::new(places),
            SuggestionClient::new(Arc::new(ScriptedLlmClient::with_responses(responses))),
        )
    }

    #[tokio::test]
    async fn empty_search_short_circuits() {
        let selector = selector(StaticPlacesClient::default(), vec![]);
        let result = selector.select(origin(), DiningPurpose::Worker, "拉麵").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn worker_pipeline_annotates_durations_and_bands() {
        let places = StaticPlacesClient {
            search_results: vec![
                candidate("a", 4.9),
                candidate("b", 4.7),
                candidate("c", 4.5),
                candidate("d", 4.3),
            ],
            details: HashMap::new(),
            // Ranked by rating: a, b, c, d. a and b walkable, c far, d unknown.
            durations: vec![Some(300), Some(480), Some(720), None],
        };
        let selector = selector(
            places,
            vec![Ok("一".to_owned()), Ok("二".to_owned()), Ok("三".to_owned())],
        );

        let result = selector.select(origin(), DiningPurpose::Worker, "拉麵").await;
        let ids: Vec<_> = result.iter().map(|c| c.place_id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(result[0].walking_duration_secs, Some(300));
        assert!(result.iter().all(|c| c.description.is_some()));
    }

    #[tokio::test]
    async fn business_pipeline_caps_at_five_without_distance_calls() {
        let places = StaticPlacesClient {
            search_results: (0..8).map(|i| candidate(&format!("p{i}"), 4.0 + f64::from(i) * 0.1)).collect(),
            details: HashMap::new(),
            durations: Vec::new(),
        };
        let selector = selector(places, (0..5).map(|i| Ok(format!("描述{i}"))).collect());

        let result = selector.select(origin(), DiningPurpose::Business, "日式").await;

        assert_eq!(result.len(), 5);
        assert_eq!(result[0].place_id, "p7");
        assert!(result.iter().all(|c| c.walking_duration_secs.is_none()));
    }

    #[tokio::test]
    async fn detail_fetch_failure_keeps_search_fields() {
        let places = StaticPlacesClient {
            search_results: vec![candidate("a", 4.0)],
            details: HashMap::new(),
            durations: vec![Some(120)],
        };
        let selector = selector(places, vec![Ok("描述".to_owned())]);

        let result = selector.select(origin(), DiningPurpose::Worker, "麵").await;
        assert_eq!(result[0].name, "餐廳a");
        assert_eq!(result[0].address.as_deref(), Some("台北市"));
    }

    #[tokio::test]
    async fn details_merge_over_search_fields() {
        let places = StaticPlacesClient {
            search_results: vec![candidate("a", 4.0)],
            details: HashMap::from([(
                "a".to_owned(),
                PlaceDetails {
                    name: Some("正式店名".to_owned()),
                    address: Some("台北市信義區".to_owned()),
                    rating: Some(4.8),
                    rating_count: Some(900),
                    photo_reference: Some("ref-9".to_owned()),
                    serves_delivery: true,
                },
            )]),
            durations: vec![Some(120)],
        };
        let selector = selector(places, vec![Ok("描述".to_owned())]);

        let result = selector.select(origin(), DiningPurpose::Worker, "麵").await;
        let enriched = &result[0];

        assert_eq!(enriched.name, "正式店名");
        assert_eq!(enriched.rating, Some(4.8));
        assert_eq!(enriched.rating_count, 900);
        assert!(enriched.serves_delivery);
        assert_eq!(enriched.photo_reference.as_deref(), Some("ref-9"));
    }

    #[tokio::test]
    async fn single_description_failure_does_not_abort_the_batch() {
        let places = StaticPlacesClient {
            search_results: (0..5).map(|i| candidate(&format!("p{i}"), 5.0 - f64::from(i) * 0.1)).collect(),
            details: HashMap::new(),
            durations: vec![Some(100), Some(200), Some(300), Some(700), Some(800)],
        };
        let selector = selector(
            places,
            vec![
                Ok("描述0".to_owned()),
                Ok("描述1".to_owned()),
                Err("model down".to_owned()),
                Ok("描述3".to_owned()),
                Ok("描述4".to_owned()),
            ],
        );

        let result = selector.select(origin(), DiningPurpose::Worker, "牛肉麵").await;

        assert_eq!(result.len(), 5);
        assert_eq!(result[2].description.as_deref(), Some("推薦您品嚐這家牛肉麵餐廳！"));
        assert_eq!(result[0].description.as_deref(), Some("描述0"));
        assert_eq!(result[4].description.as_deref(), Some("描述4"));
    }
}
