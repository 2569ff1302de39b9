//! Places provider adapter: nearby restaurant search, place details, and
//! walking-time lookups. Every operation absorbs provider failures and
//! degrades to an empty answer; callers decide what an empty answer means.

pub mod client;
pub mod types;

pub use client::{HttpPlacesClient, PlacesClient, StaticPlacesClient};
pub use types::{PlaceDetails, PlaceRecord};
