use crate::domain::place::RestaurantCandidate;
use crate::domain::profile::DiningPurpose;

pub const SEARCH_RADIUS_METERS: u32 = 1500;
pub const WORKER_SHORTLIST_SIZE: usize = 12;
pub const NEAR_BAND_MAX_SECS: u32 = 10 * 60;
pub const FAR_BAND_MAX_SECS: u32 = 15 * 60;
pub const NEAR_BAND_PICKS: usize = 3;
pub const FAR_BAND_PICKS: usize = 2;
pub const BUSINESS_PICKS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceBand {
    pub min: u8,
    pub max: u8,
}

/// Worker lunches stay in the budget tiers, business meals in the upper two.
pub fn price_band(purpose: DiningPurpose) -> PriceBand {
    match purpose {
        DiningPurpose::Worker => PriceBand { min: 1, max: 2 },
        DiningPurpose::Business => PriceBand { min: 3, max: 4 },
    }
}

/// Top candidates by rating, provider order preserved on ties, cut to the
/// shortlist that gets sent to the distance matrix.
pub fn worker_shortlist(mut candidates: Vec<RestaurantCandidate>) -> Vec<RestaurantCandidate> {
    sort_by_rating(&mut candidates);
    candidates.truncate(WORKER_SHORTLIST_SIZE);
    candidates
}

/// Final worker selection over duration-annotated candidates: up to three
/// best-rated within ten walking minutes, then up to two best-rated in the
/// ten-to-fifteen band. Candidates without a resolvable duration never
/// qualify for either band.
pub fn select_worker(candidates: Vec<RestaurantCandidate>) -> Vec<RestaurantCandidate> {
    let mut near: Vec<RestaurantCandidate> = Vec::new();
    let mut far: Vec<RestaurantCandidate> = Vec::new();

    for candidate in candidates {
        match candidate.walking_duration_secs {
            Some(secs) if secs <= NEAR_BAND_MAX_SECS => near.push(candidate),
            Some(secs) if secs <= FAR_BAND_MAX_SECS => far.push(candidate),
            _ => {}
        }
    }

    sort_by_rating(&mut near);
    near.truncate(NEAR_BAND_PICKS);
    sort_by_rating(&mut far);
    far.truncate(FAR_BAND_PICKS);

    near.extend(far);
    near
}

/// Business selection ignores distance: five best by rating, review count
/// breaking ties.
pub fn select_business(mut candidates: Vec<RestaurantCandidate>) -> Vec<RestaurantCandidate> {
    candidates.sort_by(|a, b| {
        b.rating_or_zero()
            .total_cmp(&a.rating_or_zero())
            .then(b.rating_count.cmp(&a.rating_count))
    });
    candidates.truncate(BUSINESS_PICKS);
    candidates
}

fn sort_by_rating(candidates: &mut [RestaurantCandidate]) {
    candidates.sort_by(|a, b| b.rating_or_zero().total_cmp(&a.rating_or_zero()));
}

#[cfg(test)]
mod tests {
    use super::{
        price_band, select_business, select_worker, worker_shortlist, PriceBand,
        WORKER_SHORTLIST_SIZE,
    };
    use crate::domain::place::RestaurantCandidate;
    use crate::domain::profile::{DiningPurpose, GeoPoint};

    fn candidate(name: &str, rating: Option<f64>, rating_count: u32) -> RestaurantCandidate {
        RestaurantCandidate {
            place_id: format!("place-{name}"),
            name: name.to_owned(),
            location: GeoPoint { latitude: 25.04, longitude: 121.53 },
            rating,
            rating_count,
            price_level: Some(2),
            address: Some("台北市中正區".to_owned()),
            photo_reference: None,
            serves_delivery: false,
            walking_duration_secs: None,
            description: None,
        }
    }

    fn with_duration(
        name: &str,
        rating: f64,
        walking_duration_secs: Option<u32>,
    ) -> RestaurantCandidate {
        RestaurantCandidate {
            walking_duration_secs,
            ..candidate(name, Some(rating), 10)
        }
    }

    #[test]
    fn purpose_maps_to_price_band() {
        assert_eq!(price_band(DiningPurpose::Worker), PriceBand { min: 1, max: 2 });
        assert_eq!(price_band(DiningPurpose::Business), PriceBand { min: 3, max: 4 });
    }

    #[test]
    fn shortlist_keeps_twelve_best_rated() {
        let candidates: Vec<_> =
            (0..20).map(|i| candidate(&format!("r{i}"), Some(f64::from(i) / 10.0), 1)).collect();
        let shortlist = worker_shortlist(candidates);

        assert_eq!(shortlist.len(), WORKER_SHORTLIST_SIZE);
        assert_eq!(shortlist[0].name, "r19");
        assert_eq!(shortlist[11].name, "r8");
    }

    #[test]
    fn shortlist_keeps_provider_order_on_rating_ties() {
        let candidates =
            vec![candidate("first", Some(4.0), 1), candidate("second", Some(4.0), 99)];
        let shortlist = worker_shortlist(candidates);
        assert_eq!(shortlist[0].name, "first");
    }

    #[test]
    fn worker_selection_fills_both_walking_bands() {
        let candidates = vec![
            with_duration("near-a", 4.9, Some(300)),
            with_duration("near-b", 4.5, Some(540)),
            with_duration("near-c", 4.2, Some(60)),
            with_duration("near-d", 3.9, Some(599)),
            with_duration("far-a", 4.8, Some(700)),
            with_duration("far-b", 4.1, Some(900)),
            with_duration("far-c", 4.0, Some(899)),
        ];

        let selected = select_worker(candidates);
        let names: Vec<_> = selected.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["near-a", "near-b", "near-c", "far-a", "far-b"]);
    }

    #[test]
    fn worker_selection_excludes_unresolvable_durations() {
        let candidates = vec![
            with_duration("no-duration", 5.0, None),
            with_duration("near", 3.0, Some(120)),
            with_duration("too-far", 4.9, Some(901)),
        ];

        let selected = select_worker(candidates);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "near");
    }

    #[test]
    fn worker_selection_never_exceeds_five() {
        let candidates: Vec<_> = (0..12)
            .map(|i| with_duration(&format!("r{i}"), 4.0, Some(if i < 6 { 300 } else { 750 })))
            .collect();

        let selected = select_worker(candidates);
        assert_eq!(selected.len(), 5);
        assert!(selected
            .iter()
            .all(|c| c.walking_duration_secs.is_some_and(|secs| secs <= 900)));
    }

    #[test]
    fn business_selection_is_rating_then_review_count() {
        let candidates = vec![
            candidate("low", Some(3.5), 1_000),
            candidate("high-few", Some(4.8), 12),
            candidate("high-many", Some(4.8), 480),
            candidate("mid", Some(4.1), 77),
            candidate("unrated", None, 5_000),
            candidate("top", Some(4.9), 3),
        ];

        let selected = select_business(candidates);
        let names: Vec<_> = selected.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["top", "high-many", "high-few", "mid", "low"]);
    }

    #[test]
    fn business_selection_caps_at_five_and_is_non_increasing() {
        let candidates: Vec<_> =
            (0..9).map(|i| candidate(&format!("r{i}"), Some(3.0 + f64::from(i) * 0.2), i)).collect();

        let selected = select_business(candidates);
        assert_eq!(selected.len(), 5);
        for pair in selected.windows(2) {
            assert!(pair[0].rating_or_zero() >= pair[1].rating_or_zero());
        }
    }
}
