use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use bento_core::config::PlacesConfig;
use bento_core::domain::place::RestaurantCandidate;
use bento_core::domain::profile::GeoPoint;
use bento_core::selection::PriceBand;

use crate::types::{
    DistanceMatrixResponse, NearbySearchResponse, PlaceDetails, PlaceDetailsResponse,
};

/// Provider lookups the selection pipeline needs. Implementations never
/// surface transport errors: a failed call is an empty answer.
#[async_trait]
pub trait PlacesClient: Send + Sync {
    async fn nearby_search(
        &self,
        origin: GeoPoint,
        keyword: &str,
        radius_meters: u32,
        band: PriceBand,
    ) -> Vec<RestaurantCandidate>;

    async fn place_details(&self, place_id: &str) -> Option<PlaceDetails>;

    /// Walking durations from `origin` to each destination, same length and
    /// order as `destinations`. A destination the provider could not resolve
    /// is `None`; a failed call is all-`None`.
    async fn walking_durations(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
    ) -> Vec<Option<u32>>;
}

pub struct HttpPlacesClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl HttpPlacesClient {
    pub fn new(config: &PlacesConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn format_latlng(point: GeoPoint) -> String {
    format!("{},{}", point.latitude, point.longitude)
}

#[async_trait]
impl PlacesClient for HttpPlacesClient {
    async fn nearby_search(
        &self,
        origin: GeoPoint,
        keyword: &str,
        radius_meters: u32,
        band: PriceBand,
    ) -> Vec<RestaurantCandidate> {
        let request = self
            .http
            .get(self.endpoint("/maps/api/place/nearbysearch/json"))
            .query(&[
                ("location", format_latlng(origin).as_str()),
                ("radius", radius_meters.to_string().as_str()),
                ("type", "restaurant"),
                ("keyword", keyword),
                ("opennow", "true"),
                ("minprice", band.min.to_string().as_str()),
                ("maxprice", band.max.to_string().as_str()),
                ("key", self.api_key.expose_secret()),
            ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "places.nearby_search.request_failed", error = %error, keyword, "nearby search request failed");
                return Vec::new();
            }
        };

        let body: NearbySearchResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                warn!(event_name = "places.nearby_search.decode_failed", error = %error, keyword, "nearby search response was not decodable");
                return Vec::new();
            }
        };

        if body.status != "OK" && body.status != "ZERO_RESULTS" {
            warn!(
                event_name = "places.nearby_search.provider_status",
                status = %body.status,
                keyword,
                "nearby search returned a non-ok status"
            );
            return Vec::new();
        }

        body.results.into_iter().filter_map(|record| record.into_candidate()).collect()
    }

    async fn place_details(&self, place_id: &str) -> Option<PlaceDetails> {
        let fields = "name,formatted_address,geometry,rating,user_ratings_total,photos,vicinity,serves_delivery";
        let request = self.http.get(self.endpoint("/maps/api/place/details/json")).query(&[
            ("place_id", place_id),
            ("fields", fields),
            ("key", self.api_key.expose_secret()),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "places.details.request_failed", error = %error, place_id, "place details request failed");
                return None;
            }
        };

        let body: PlaceDetailsResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                warn!(event_name = "places.details.decode_failed", error = %error, place_id, "place details response was not decodable");
                return None;
            }
        };

        if body.status != "OK" {
            warn!(
                event_name = "places.details.provider_status",
                status = %body.status,
                place_id,
                "place details returned a non-ok status"
            );
            return None;
        }

        body.result.map(|record| record.into_details())
    }

    async fn walking_durations(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
    ) -> Vec<Option<u32>> {
        if destinations.is_empty() {
            return Vec::new();
        }
        let unresolved = vec![None; destinations.len()];

        let joined = destinations
            .iter()
            .map(|point| format_latlng(*point))
            .collect::<Vec<_>>()
            .join("|");
        let request = self.http.get(self.endpoint("/maps/api/distancematrix/json")).query(&[
            ("origins", format_latlng(origin).as_str()),
            ("destinations", joined.as_str()),
            ("mode", "walking"),
            ("key", self.api_key.expose_secret()),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "places.distance_matrix.request_failed", error = %error, "distance matrix request failed");
                return unresolved;
            }
        };

        let body: DistanceMatrixResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                warn!(event_name = "places.distance_matrix.decode_failed", error = %error, "distance matrix response was not decodable");
                return unresolved;
            }
        };

        if body.status != "OK" {
            warn!(
                event_name = "places.distance_matrix.provider_status",
                status = %body.status,
                "distance matrix returned a non-ok status"
            );
            return unresolved;
        }

        let Some(row) = body.rows.into_iter().next() else {
            return unresolved;
        };

        let mut durations: Vec<Option<u32>> = row
            .elements
            .into_iter()
            .map(|element| {
                (element.status == "OK").then_some(element.duration.map(|d| d.value)).flatten()
            })
            .collect();
        durations.resize(destinations.len(), None);
        durations
    }
}

/// Canned in-process provider for tests: responses are keyed by keyword and
/// place id, and walking durations replay a fixed sequence.
#[derive(Default)]
pub struct StaticPlacesClient {
    pub search_results: Vec<RestaurantCandidate>,
    pub details: HashMap<String, PlaceDetails>,
    pub durations: Vec<Option<u32>>,
}

#[async_trait]
impl PlacesClient for StaticPlacesClient {
    async fn nearby_search(
        &self,
        _origin: GeoPoint,
        _keyword: &str,
        _radius_meters: u32,
        _band: PriceBand,
    ) -> Vec<RestaurantCandidate> {
        self.search_results.clone()
    }

    async fn place_details(&self, place_id: &str) -> Option<PlaceDetails> {
        self.details.get(place_id).cloned()
    }

    async fn walking_durations(
        &self,
        _origin: GeoPoint,
        destinations: &[GeoPoint],
    ) -> Vec<Option<u32>> {
        let mut durations = self.durations.clone();
        durations.resize(destinations.len(), None);
        durations
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bento_core::domain::place::RestaurantCandidate;
    use bento_core::domain::profile::GeoPoint;
    use bento_core::selection::{price_band, SEARCH_RADIUS_METERS};

    use super::{PlacesClient, StaticPlacesClient};
    use crate::types::PlaceDetails;

    fn origin() -> GeoPoint {
        GeoPoint { latitude: 25.03, longitude: 121.56 }
    }

    fn candidate(place_id: &str) -> RestaurantCandidate {
        RestaurantCandidate {
            place_id: place_id.to_owned(),
            name: "測試餐廳".to_owned(),
            location: origin(),
            rating: Some(4.0),
            rating_count: 10,
            price_level: Some(1),
            address: None,
            photo_reference: None,
            serves_delivery: false,
            walking_duration_secs: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn static_client_replays_configured_results() {
        let client = StaticPlacesClient {
            search_results: vec![candidate("p-1")],
            details: HashMap::from([(
                "p-1".to_owned(),
                PlaceDetails { serves_delivery: true, ..PlaceDetails::default() },
            )]),
            durations: vec![Some(300)],
        };

        let results = client
            .nearby_search(
                origin(),
                "拉麵",
                SEARCH_RADIUS_METERS,
                price_band(bento_core::domain::profile::DiningPurpose::Worker),
            )
            .await;
        assert_eq!(results.len(), 1);

        let details = client.place_details("p-1").await.expect("details configured");
        assert!(details.serves_delivery);
        assert!(client.place_details("p-404").await.is_none());
    }

    #[tokio::test]
    async fn static_durations_pad_to_destination_count() {
        let client =
            StaticPlacesClient { durations: vec![Some(120)], ..StaticPlacesClient::default() };
        let durations = client.walking_durations(origin(), &[origin(), origin(), origin()]).await;
        assert_eq!(durations, vec![Some(120), None, None]);
    }
}
