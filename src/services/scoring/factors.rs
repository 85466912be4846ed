use super::{ContextRules, FactorScore, ScoringFactor, ScoringInput};
use crate::{
    models::{PriceTier, TimeOfDay},
    services::geo,
};

pub const CATEGORY_WEIGHT: f64 = 0.30;
pub const RATING_WEIGHT: f64 = 0.25;
pub const RATING_BOOST: f64 = 1.2;
pub const RATING_BOOST_THRESHOLD: f64 = 4.0;
pub const PROXIMITY_WEIGHT: f64 = 0.20;
pub const CLOSE_BY_KM: f64 = 2.0;
pub const CLUSTER_WEIGHT: f64 = 0.10;
pub const PRICE_WEIGHT: f64 = 0.10;
pub const AMENITY_WEIGHT: f64 = 0.10;
pub const SOCIAL_WEIGHT: f64 = 0.05;
pub const FEATURED_BONUS: f64 = 0.05;
pub const TIME_OF_DAY_BONUS: f64 = 0.10;
pub const GROUP_BONUS: f64 = 0.05;
pub const LARGE_GROUP_SIZE: u32 = 4;

const MAX_RATING: f64 = 5.0;
const CLUSTER_WEIGHT_SCALE: f64 = 10.0;

/// Affinity for the venue's category
pub struct CategoryFactor;

impl ScoringFactor for CategoryFactor {
    fn name(&self) -> &'static str {
        "category"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        match input.profile.category_affinity.get(&input.venue.category_id) {
            Some(affinity) => FactorScore::explained(
                affinity * CATEGORY_WEIGHT,
                "Matches your preferred category",
            ),
            None => FactorScore::ZERO,
        }
    }
}

/// Venue rating, boosted for highly rated venues
pub struct RatingFactor;

impl ScoringFactor for RatingFactor {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        let rating = input.venue.average_rating;
        let base = (rating / MAX_RATING) * RATING_WEIGHT;

        if rating >= RATING_BOOST_THRESHOLD {
            FactorScore::explained(base * RATING_BOOST, "Highly rated venue")
        } else {
            FactorScore::silent(base)
        }
    }
}

/// Closeness to the requester; zero beyond the search radius
pub struct ProximityFactor;

impl ScoringFactor for ProximityFactor {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        let Some(origin) = &input.context.location else {
            return FactorScore::ZERO;
        };
        let max_distance = input.context.max_distance_km;
        if max_distance <= 0.0 {
            return FactorScore::ZERO;
        }

        let distance = geo::distance_km(origin, &input.venue.location);
        let contribution = ((max_distance - distance) / max_distance).max(0.0) * PROXIMITY_WEIGHT;

        if distance <= CLOSE_BY_KM {
            FactorScore::explained(contribution, "Close to your location")
        } else {
            FactorScore::silent(contribution)
        }
    }
}

/// Venue inside one of the user's frequented areas.
///
/// Only the first matching cluster counts. Evaluated only for requests that
/// carry a location.
pub struct ClusterFactor;

impl ScoringFactor for ClusterFactor {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        if input.context.location.is_none() {
            return FactorScore::ZERO;
        }

        let venue = &input.venue.location;
        input
            .profile
            .location_clusters
            .iter()
            .find(|cluster| {
                geo::haversine_km(
                    cluster.latitude,
                    cluster.longitude,
                    venue.latitude,
                    venue.longitude,
                ) <= cluster.radius_km
            })
            .map(|cluster| {
                FactorScore::explained(
                    (cluster.weight / CLUSTER_WEIGHT_SCALE) * CLUSTER_WEIGHT,
                    "In an area you frequent",
                )
            })
            .unwrap_or(FactorScore::ZERO)
    }
}

/// Venue price tier among the preferred ones
pub struct PriceFactor;

impl ScoringFactor for PriceFactor {
    fn name(&self) -> &'static str {
        "price"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        match input.venue.price_tier {
            Some(tier) if input.profile.price_affinity.contains(&tier) => {
                FactorScore::explained(PRICE_WEIGHT, "Matches your price preference")
            }
            _ => FactorScore::ZERO,
        }
    }
}

/// Share of preferred amenities the venue offers
pub struct AmenityFactor;

impl ScoringFactor for AmenityFactor {
    fn name(&self) -> &'static str {
        "amenity"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        let preferred = &input.profile.amenity_affinity;
        if preferred.is_empty() {
            return FactorScore::ZERO;
        }

        let matched = preferred
            .iter()
            .filter(|amenity| input.venue.amenities.contains(amenity))
            .count();
        if matched == 0 {
            return FactorScore::ZERO;
        }

        FactorScore::explained(
            (matched as f64 / preferred.len() as f64) * AMENITY_WEIGHT,
            "Has amenities you prefer",
        )
    }
}

/// Positive reviews from followed users, relative to how many users are followed
pub struct SocialFactor;

impl ScoringFactor for SocialFactor {
    fn name(&self) -> &'static str {
        "social"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        let followed = input.profile.social_graph.len();
        if followed == 0 || input.positive_reviews_from_followed == 0 {
            return FactorScore::ZERO;
        }

        let signal = f64::from(input.positive_reviews_from_followed) / followed as f64;
        FactorScore::explained(signal * SOCIAL_WEIGHT, "Popular with people you follow")
    }
}

/// Flat bonus for featured venues
pub struct FeaturedFactor;

impl ScoringFactor for FeaturedFactor {
    fn name(&self) -> &'static str {
        "featured"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        if input.venue.is_featured {
            FactorScore::explained(FEATURED_BONUS, "Featured venue")
        } else {
            FactorScore::ZERO
        }
    }
}

/// Time-of-day and group-size heuristics; never produces a reason
pub struct ContextFactor {
    rules: ContextRules,
}

impl ContextFactor {
    pub fn new(rules: ContextRules) -> Self {
        Self { rules }
    }
}

impl ScoringFactor for ContextFactor {
    fn name(&self) -> &'static str {
        "context"
    }

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore {
        let venue = input.venue;
        let mut bonus = 0.0;

        match input.context.time_of_day {
            Some(TimeOfDay::Evening) if venue.category_id == self.rules.nightlife_category_id => {
                bonus += TIME_OF_DAY_BONUS
            }
            Some(TimeOfDay::Morning) if venue.category_id == self.rules.cafe_category_id => {
                bonus += TIME_OF_DAY_BONUS
            }
            _ => {}
        }

        // Larger groups favor anything but the top price tier
        if input.context.group_size.unwrap_or(0) > LARGE_GROUP_SIZE
            && venue.price_tier != Some(PriceTier::Luxury)
        {
            bonus += GROUP_BONUS;
        }

        FactorScore::silent(bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Coordinate, LocationCluster, RecommendationContext, UserPreferenceProfile, Venue,
    };

    const SF: Coordinate = Coordinate {
        latitude: 37.7749,
        longitude: -122.4194,
    };

    fn venue() -> Venue {
        Venue {
            id: 1,
            name: "Blue Bottle".to_string(),
            category_id: 3,
            subcategory_id: None,
            price_tier: Some(PriceTier::Moderate),
            average_rating: 3.5,
            location: SF,
            amenities: vec!["wifi".to_string(), "outdoor_seating".to_string()],
            is_featured: false,
        }
    }

    fn evaluate(
        factor: &dyn ScoringFactor,
        venue: &Venue,
        profile: &UserPreferenceProfile,
        context: &RecommendationContext,
    ) -> FactorScore {
        factor.evaluate(&ScoringInput {
            venue,
            profile,
            context,
            positive_reviews_from_followed: 0,
        })
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_category_uses_raw_affinity() {
        let mut profile = UserPreferenceProfile::empty(1);
        profile.category_affinity.insert(3, 2.8);
        let ctx = RecommendationContext::new(1, 10.0, 10);

        let score = evaluate(&CategoryFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 2.8 * 0.3);
        assert_eq!(score.reason, Some("Matches your preferred category"));

        let empty = UserPreferenceProfile::empty(1);
        assert_eq!(evaluate(&CategoryFactor, &venue(), &empty, &ctx), FactorScore::ZERO);
    }

    #[test]
    fn test_rating_without_boost() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let profile = UserPreferenceProfile::empty(1);

        let score = evaluate(&RatingFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 3.5 / 5.0 * 0.25);
        assert_eq!(score.reason, None);
    }

    #[test]
    fn test_rating_boost_at_threshold() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let profile = UserPreferenceProfile::empty(1);
        let mut v = venue();
        v.average_rating = 4.0;

        let score = evaluate(&RatingFactor, &v, &profile, &ctx);
        assert_close(score.contribution, 4.0 / 5.0 * 0.25 * 1.2);
        assert_eq!(score.reason, Some("Highly rated venue"));
    }

    #[test]
    fn test_proximity_requires_location() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let profile = UserPreferenceProfile::empty(1);
        assert_eq!(evaluate(&ProximityFactor, &venue(), &profile, &ctx), FactorScore::ZERO);
    }

    #[test]
    fn test_proximity_at_same_point_is_full_weight() {
        let ctx = RecommendationContext::new(1, 10.0, 10).with_location(SF);
        let profile = UserPreferenceProfile::empty(1);

        let score = evaluate(&ProximityFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 0.2);
        assert_eq!(score.reason, Some("Close to your location"));
    }

    #[test]
    fn test_proximity_beyond_radius_is_zero_not_negative() {
        let ctx = RecommendationContext::new(1, 5.0, 10).with_location(Coordinate {
            latitude: 37.3382,
            longitude: -121.8863,
        });
        let profile = UserPreferenceProfile::empty(1);

        let score = evaluate(&ProximityFactor, &venue(), &profile, &ctx);
        assert_eq!(score.contribution, 0.0);
        assert_eq!(score.reason, None);
    }

    #[test]
    fn test_proximity_partial_without_reason() {
        // ~5.56 km north
        let ctx = RecommendationContext::new(1, 10.0, 10).with_location(Coordinate {
            latitude: 37.8249,
            longitude: -122.4194,
        });
        let profile = UserPreferenceProfile::empty(1);

        let score = evaluate(&ProximityFactor, &venue(), &profile, &ctx);
        assert!(score.contribution > 0.08 && score.contribution < 0.09);
        assert_eq!(score.reason, None);
    }

    #[test]
    fn test_cluster_first_match_only() {
        let ctx = RecommendationContext::new(1, 10.0, 10).with_location(SF);
        let mut profile = UserPreferenceProfile::empty(1);
        profile.location_clusters = vec![
            LocationCluster {
                latitude: 40.7128,
                longitude: -74.0060,
                weight: 9.0,
                radius_km: 2.0,
            },
            LocationCluster {
                latitude: 37.7750,
                longitude: -122.4195,
                weight: 4.0,
                radius_km: 2.0,
            },
            LocationCluster {
                latitude: 37.7749,
                longitude: -122.4194,
                weight: 8.0,
                radius_km: 2.0,
            },
        ];

        let score = evaluate(&ClusterFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 0.4 * 0.1);
        assert_eq!(score.reason, Some("In an area you frequent"));
    }

    #[test]
    fn test_cluster_skipped_without_request_location() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let mut profile = UserPreferenceProfile::empty(1);
        profile.location_clusters = vec![LocationCluster {
            latitude: 37.7749,
            longitude: -122.4194,
            weight: 4.0,
            radius_km: 2.0,
        }];

        assert_eq!(evaluate(&ClusterFactor, &venue(), &profile, &ctx), FactorScore::ZERO);
    }

    #[test]
    fn test_price_match() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let mut profile = UserPreferenceProfile::empty(1);
        profile.price_affinity.insert(PriceTier::Moderate);

        let score = evaluate(&PriceFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 0.1);

        let mut untiered = venue();
        untiered.price_tier = None;
        assert_eq!(evaluate(&PriceFactor, &untiered, &profile, &ctx), FactorScore::ZERO);
    }

    #[test]
    fn test_amenity_share() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let mut profile = UserPreferenceProfile::empty(1);
        profile.amenity_affinity.insert("wifi".to_string());
        profile.amenity_affinity.insert("parking".to_string());
        profile.amenity_affinity.insert("live_music".to_string());
        profile.amenity_affinity.insert("outdoor_seating".to_string());

        let score = evaluate(&AmenityFactor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 0.5 * 0.1);
        assert_eq!(score.reason, Some("Has amenities you prefer"));
    }

    #[test]
    fn test_amenity_without_preferences_is_zero() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let profile = UserPreferenceProfile::empty(1);
        assert_eq!(evaluate(&AmenityFactor, &venue(), &profile, &ctx), FactorScore::ZERO);
    }

    #[test]
    fn test_social_signal() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let mut profile = UserPreferenceProfile::empty(1);
        profile.social_graph.extend([2, 3, 4, 5]);
        let v = venue();

        let score = SocialFactor.evaluate(&ScoringInput {
            venue: &v,
            profile: &profile,
            context: &ctx,
            positive_reviews_from_followed: 2,
        });
        assert_close(score.contribution, 0.5 * 0.05);
        assert_eq!(score.reason, Some("Popular with people you follow"));

        let silent = SocialFactor.evaluate(&ScoringInput {
            venue: &v,
            profile: &profile,
            context: &ctx,
            positive_reviews_from_followed: 0,
        });
        assert_eq!(silent, FactorScore::ZERO);
    }

    #[test]
    fn test_featured_bonus() {
        let ctx = RecommendationContext::new(1, 10.0, 10);
        let profile = UserPreferenceProfile::empty(1);
        let mut v = venue();
        v.is_featured = true;

        let score = evaluate(&FeaturedFactor, &v, &profile, &ctx);
        assert_close(score.contribution, 0.05);
        assert_eq!(score.reason, Some("Featured venue"));
    }

    #[test]
    fn test_context_morning_cafe_and_large_group() {
        let factor = ContextFactor::new(ContextRules::default());
        let profile = UserPreferenceProfile::empty(1);
        let ctx = RecommendationContext::new(1, 10.0, 10)
            .with_time_of_day(TimeOfDay::Morning)
            .with_group_size(5);

        let score = evaluate(&factor, &venue(), &profile, &ctx);
        assert_close(score.contribution, 0.15);
        assert_eq!(score.reason, None);
    }

    #[test]
    fn test_context_evening_nightlife_only() {
        let factor = ContextFactor::new(ContextRules::default());
        let profile = UserPreferenceProfile::empty(1);
        let ctx = RecommendationContext::new(1, 10.0, 10).with_time_of_day(TimeOfDay::Evening);

        let mut bar = venue();
        bar.category_id = 2;
        assert_close(evaluate(&factor, &bar, &profile, &ctx).contribution, 0.1);
        assert_close(evaluate(&factor, &venue(), &profile, &ctx).contribution, 0.0);
    }

    #[test]
    fn test_context_group_bonus_skips_top_tier() {
        let factor = ContextFactor::new(ContextRules::default());
        let profile = UserPreferenceProfile::empty(1);
        let ctx = RecommendationContext::new(1, 10.0, 10).with_group_size(8);

        let mut luxury = venue();
        luxury.price_tier = Some(PriceTier::Luxury);
        assert_close(evaluate(&factor, &luxury, &profile, &ctx).contribution, 0.0);

        let small = RecommendationContext::new(1, 10.0, 10).with_group_size(4);
        assert_close(evaluate(&factor, &venue(), &profile, &small).contribution, 0.0);
    }

    #[test]
    fn test_context_uses_configured_categories() {
        let factor = ContextFactor::new(ContextRules {
            nightlife_category_id: 11,
            cafe_category_id: 12,
        });
        let profile = UserPreferenceProfile::empty(1);
        let ctx = RecommendationContext::new(1, 10.0, 10).with_time_of_day(TimeOfDay::Morning);

        let mut cafe = venue();
        cafe.category_id = 12;
        assert_close(evaluate(&factor, &cafe, &profile, &ctx).contribution, 0.1);
        assert_close(evaluate(&factor, &venue(), &profile, &ctx).contribution, 0.0);
    }
}
