pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod intent;
pub mod selection;

pub use domain::place::RestaurantCandidate;
pub use domain::profile::{
    ChoiceAction, DiningPurpose, GeoPoint, PreferenceRecord, ProfilePatch, RestaurantChoice,
    UserId, UserProfile,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use intent::{extract_food_keyword, is_recommendation_request, TurnResolution};
pub use selection::{price_band, select_business, select_worker, worker_shortlist, PriceBand};
