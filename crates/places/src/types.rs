use serde::Deserialize;

use bento_core::domain::place::RestaurantCandidate;
use bento_core::domain::profile::GeoPoint;

#[derive(Debug, Deserialize)]
pub(crate) struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceDetailsResponse {
    pub status: String,
    pub result: Option<PlaceRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixRow {
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixElement {
    pub status: String,
    pub duration: Option<DistanceMatrixValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixValue {
    pub value: u32,
}

/// Raw provider record; fields are lenient because search and detail
/// responses populate different subsets.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaceRecord {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub vicinity: Option<String>,
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub serves_delivery: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Photo {
    pub photo_reference: Option<String>,
}

impl PlaceRecord {
    /// Lifts a search record into the pipeline type. Records without an
    /// identifier, name, or position are unusable downstream and dropped.
    pub fn into_candidate(self) -> Option<RestaurantCandidate> {
        let place_id = self.place_id?;
        let name = self.name?;
        let geometry = self.geometry?;

        Some(RestaurantCandidate {
            place_id,
            name,
            location: GeoPoint { latitude: geometry.location.lat, longitude: geometry.location.lng },
            rating: self.rating,
            rating_count: self.user_ratings_total.unwrap_or(0),
            price_level: self.price_level,
            address: self.vicinity.or(self.formatted_address),
            photo_reference: self.photos.into_iter().find_map(|photo| photo.photo_reference),
            serves_delivery: self.serves_delivery,
            walking_duration_secs: None,
            description: None,
        })
    }

    pub fn into_details(self) -> PlaceDetails {
        PlaceDetails {
            name: self.name,
            address: self.vicinity.or(self.formatted_address),
            rating: self.rating,
            rating_count: self.user_ratings_total,
            photo_reference: self.photos.into_iter().find_map(|photo| photo.photo_reference),
            serves_delivery: self.serves_delivery,
        }
    }
}

/// The detail fields worth merging back onto a candidate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub photo_reference: Option<String>,
    pub serves_delivery: bool,
}

#[cfg(test)]
mod tests {
    use super::PlaceRecord;

    #[test]
    fn search_result_parses_into_candidate() {
        let json = r#"{
            "place_id": "ChIJabc",
            "name": "老王牛肉麵",
            "geometry": {"location": {"lat": 25.04, "lng": 121.53}},
            "rating": 4.6,
            "user_ratings_total": 812,
            "price_level": 1,
            "vicinity": "台北市中正區羅斯福路一段",
            "photos": [{"photo_reference": "ref-1"}]
        }"#;

        let record: PlaceRecord = serde_json::from_str(json).expect("parse record");
        let candidate = record.into_candidate().expect("complete record");

        assert_eq!(candidate.place_id, "ChIJabc");
        assert_eq!(candidate.name, "老王牛肉麵");
        assert_eq!(candidate.rating, Some(4.6));
        assert_eq!(candidate.rating_count, 812);
        assert_eq!(candidate.photo_reference.as_deref(), Some("ref-1"));
        assert!(!candidate.serves_delivery);
    }

    #[test]
    fn record_without_identifier_is_dropped() {
        let record: PlaceRecord =
            serde_json::from_str(r#"{"name": "無名攤販"}"#).expect("parse record");
        assert!(record.into_candidate().is_none());
    }

    #[test]
    fn details_prefer_vicinity_over_formatted_address() {
        let json = r#"{
            "name": "鼎泰豐",
            "vicinity": "信義路二段",
            "formatted_address": "台北市大安區信義路二段194號",
            "serves_delivery": true
        }"#;

        let record: PlaceRecord = serde_json::from_str(json).expect("parse record");
        let details = record.into_details();

        assert_eq!(details.address.as_deref(), Some("信義路二段"));
        assert!(details.serves_delivery);
    }
}
