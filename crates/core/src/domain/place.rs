use serde::{Deserialize, Serialize};

use crate::domain::profile::GeoPoint;

/// A restaurant in flight through the selection pipeline. Materialized per
/// search and never persisted; only the user's eventual choice is recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantCandidate {
    pub place_id: String,
    pub name: String,
    pub location: GeoPoint,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub price_level: Option<u8>,
    pub address: Option<String>,
    pub photo_reference: Option<String>,
    pub serves_delivery: bool,
    pub walking_duration_secs: Option<u32>,
    pub description: Option<String>,
}

impl RestaurantCandidate {
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// Whole walking minutes for display, rounded to the nearest minute.
    pub fn walking_minutes(&self) -> Option<u32> {
        self.walking_duration_secs.map(|secs| (secs + 30) / 60)
    }
}
