use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        CategoryId, CheckinHistoryRow, HistorySegment, LocationCluster, PriceTier,
        ReviewHistoryRow, TimeOfDay, UserId, UserPreferenceProfile,
    },
    repositories::UserHistoryRepository,
    services::clustering::ClusterAccumulator,
};

/// Occurrences needed before a price tier or amenity counts as preferred
const MIN_PREFERENCE_OCCURRENCES: u32 = 2;
const MAX_RATING: f64 = 5.0;

/// Preferences derived from review history
#[derive(Debug, Default, PartialEq)]
pub struct ReviewSegment {
    pub category_affinity: BTreeMap<CategoryId, f64>,
    pub price_affinity: BTreeSet<PriceTier>,
    pub amenity_affinity: BTreeSet<String>,
    pub average_rating_given: f64,
}

/// Preferences derived from check-in history
#[derive(Debug, Default, PartialEq)]
pub struct CheckinSegment {
    pub location_clusters: Vec<LocationCluster>,
    pub active_hours: BTreeMap<TimeOfDay, u32>,
}

/// Folds grouped review rows into category, price and amenity affinities.
///
/// Each row adds `rating * count / 5.0` to its category; the weight is
/// accumulated per row, never combined first and divided later.
pub fn fold_reviews(rows: &[ReviewHistoryRow]) -> ReviewSegment {
    let mut segment = ReviewSegment::default();
    let mut price_counts: HashMap<PriceTier, u32> = HashMap::new();
    let mut amenity_counts: HashMap<&str, u32> = HashMap::new();
    let mut rating_sum = 0.0;
    let mut rating_count: u64 = 0;

    for row in rows {
        let weight = (row.rating * f64::from(row.count) / MAX_RATING).max(0.0);
        *segment.category_affinity.entry(row.category_id).or_insert(0.0) += weight;

        if let Some(tier) = row.price_tier {
            let seen = price_counts.entry(tier).or_insert(0);
            *seen = seen.saturating_add(row.count);
        }
        for amenity in &row.amenities {
            let seen = amenity_counts.entry(amenity.as_str()).or_insert(0);
            *seen = seen.saturating_add(row.count);
        }

        rating_sum += row.rating * f64::from(row.count);
        rating_count = rating_count.saturating_add(u64::from(row.count));
    }

    if rating_count > 0 {
        segment.average_rating_given = rating_sum / rating_count as f64;
    }

    segment.price_affinity = price_counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_PREFERENCE_OCCURRENCES)
        .map(|(tier, _)| tier)
        .collect();
    segment.amenity_affinity = amenity_counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_PREFERENCE_OCCURRENCES)
        .map(|(amenity, _)| amenity.to_string())
        .collect();

    segment
}

/// Folds grouped check-in rows into location clusters and an active-hours histogram
pub fn fold_checkins(rows: &[CheckinHistoryRow]) -> CheckinSegment {
    let mut clusters = ClusterAccumulator::new();
    let mut active_hours = BTreeMap::new();

    for row in rows {
        clusters.add(row.latitude, row.longitude, f64::from(row.count));
        let hits = active_hours.entry(TimeOfDay::from_hour(row.hour)).or_insert(0u32);
        *hits = hits.saturating_add(row.count);
    }

    CheckinSegment {
        location_clusters: clusters.into_clusters(),
        active_hours,
    }
}

/// Builds a `UserPreferenceProfile` from a user's history
///
/// Reviews, check-ins and follows are fetched concurrently and folded
/// independently. A failed segment is logged and listed in
/// `unavailable_segments`; it never aborts the other segments, so extraction
/// itself cannot fail.
#[derive(Clone)]
pub struct PreferenceExtractor {
    history: Arc<dyn UserHistoryRepository>,
}

impl PreferenceExtractor {
    pub fn new(history: Arc<dyn UserHistoryRepository>) -> Self {
        Self { history }
    }

    pub async fn extract(&self, user_id: UserId) -> UserPreferenceProfile {
        let (reviews, checkins, follows) = tokio::join!(
            self.history.review_history(user_id),
            self.history.checkin_history(user_id),
            self.history.follows(user_id),
        );

        let mut profile = UserPreferenceProfile::empty(user_id);

        match reviews {
            Ok(rows) => {
                let segment = fold_reviews(&rows);
                profile.category_affinity = segment.category_affinity;
                profile.price_affinity = segment.price_affinity;
                profile.amenity_affinity = segment.amenity_affinity;
                profile.average_rating_given = segment.average_rating_given;
            }
            Err(e) => Self::mark_unavailable(&mut profile, HistorySegment::Reviews, &e),
        }

        match checkins {
            Ok(rows) => {
                let segment = fold_checkins(&rows);
                profile.location_clusters = segment.location_clusters;
                profile.active_hours = segment.active_hours;
            }
            Err(e) => Self::mark_unavailable(&mut profile, HistorySegment::Checkins, &e),
        }

        match follows {
            Ok(followed) => profile.social_graph = followed.into_iter().collect(),
            Err(e) => Self::mark_unavailable(&mut profile, HistorySegment::Social, &e),
        }

        tracing::debug!(
            user_id,
            categories = profile.category_affinity.len(),
            clusters = profile.location_clusters.len(),
            follows = profile.social_graph.len(),
            complete = profile.is_complete(),
            "Extracted preference profile"
        );

        profile
    }

    fn mark_unavailable(
        profile: &mut UserPreferenceProfile,
        segment: HistorySegment,
        error: &AppError,
    ) {
        tracing::warn!(
            user_id = profile.user_id,
            segment = segment.as_str(),
            error = %error,
            "History segment unavailable, continuing without it"
        );
        profile.unavailable_segments.push(segment);
    }
}
