use std::cmp::Ordering;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CategoryId, Coordinate, MeetingPlan, NearbyVenue, RecommendationContext,
        RecommendationResult, SimilarVenue, UserId, UserPreferenceProfile, Venue, VenueId,
    },
    repositories::{UserHistoryRepository, VenueRepository},
    services::{
        geo,
        preferences::PreferenceExtractor,
        scoring::{rank, ContextRules, Scorer, ScoringInput},
    },
};

/// Search radius around the reference venue for similar venues
pub const SIMILAR_RADIUS_KM: f64 = 50.0;
pub const DEFAULT_CANDIDATE_CAP: usize = 200;
/// Largest radius searched for venues around a meeting point
pub const MAX_NEARBY_RADIUS_KM: f64 = 100.0;
pub const NEARBY_VENUE_LIMIT: usize = 50;

#[derive(Clone)]
struct ProfileCache {
    cache: Cache,
    ttl_secs: u64,
}

/// Orchestrates profile extraction, candidate retrieval, scoring and ranking
pub struct RecommendationEngine {
    venues: Arc<dyn VenueRepository>,
    history: Arc<dyn UserHistoryRepository>,
    extractor: PreferenceExtractor,
    scorer: Scorer,
    candidate_cap: usize,
    profile_cache: Option<ProfileCache>,
}

impl RecommendationEngine {
    pub fn new(
        venues: Arc<dyn VenueRepository>,
        history: Arc<dyn UserHistoryRepository>,
    ) -> Self {
        Self {
            venues,
            extractor: PreferenceExtractor::new(history.clone()),
            history,
            scorer: Scorer::default(),
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            profile_cache: None,
        }
    }

    /// Engine with scoring rules and candidate cap taken from configuration
    pub fn from_config(
        venues: Arc<dyn VenueRepository>,
        history: Arc<dyn UserHistoryRepository>,
        config: &Config,
    ) -> Self {
        Self::new(venues, history)
            .with_scorer(Scorer::standard(ContextRules {
                nightlife_category_id: config.nightlife_category_id,
                cafe_category_id: config.cafe_category_id,
            }))
            .with_candidate_cap(config.candidate_cap)
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_candidate_cap(mut self, candidate_cap: usize) -> Self {
        self.candidate_cap = candidate_cap;
        self
    }

    /// Routes profile loading through Redis
    pub fn with_profile_cache(mut self, cache: Cache, ttl_secs: u64) -> Self {
        self.profile_cache = Some(ProfileCache { cache, ttl_secs });
        self
    }

    /// Ranked recommendations for the context's user
    ///
    /// Fails with `InvalidInput` for a malformed context, `NotFound` for an
    /// unknown user, and with the repository error when candidates cannot be
    /// loaded. Everything else degrades: a failed history segment leaves the
    /// profile partial and a failed social lookup counts as no signal.
    pub async fn recommend(
        &self,
        context: &RecommendationContext,
    ) -> AppResult<Vec<RecommendationResult>> {
        context.validate()?;

        let profile = self.profile(context.user_id).await?;

        let candidates = self
            .venues
            .candidate_venues(context, &profile, self.candidate_cap)
            .await?;

        let signals = self.social_signals(&candidates, &profile).await;

        let scored = candidates
            .iter()
            .zip(signals)
            .map(|(venue, positive_reviews_from_followed)| {
                self.score_with_signal(venue, &profile, context, positive_reviews_from_followed)
            })
            .collect();
        let ranked = rank(scored, context.limit);

        tracing::info!(
            user_id = context.user_id,
            candidate_count = candidates.len(),
            result_count = ranked.len(),
            partial_profile = !profile.is_complete(),
            "Generated recommendations"
        );

        Ok(ranked)
    }

    /// The user's preference profile, from the cache when one is configured
    pub async fn profile(&self, user_id: UserId) -> AppResult<UserPreferenceProfile> {
        if !self.history.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        match &self.profile_cache {
            Some(ProfileCache { cache, ttl_secs }) => cached!(
                cache,
                CacheKey::Profile(user_id),
                *ttl_secs,
                async { Ok::<_, AppError>(self.extractor.extract(user_id).await) },
                keep_if |profile: &UserPreferenceProfile| profile.is_complete()
            ),
            None => Ok(self.extractor.extract(user_id).await),
        }
    }

    /// Scores a single venue, resolving its social signal first
    pub async fn score_venue(
        &self,
        venue: &Venue,
        profile: &UserPreferenceProfile,
        context: &RecommendationContext,
    ) -> RecommendationResult {
        let signal = self.social_signals(std::slice::from_ref(venue), profile).await;
        let positive_reviews_from_followed = signal.first().copied().unwrap_or(0);
        self.score_with_signal(venue, profile, context, positive_reviews_from_followed)
    }

    /// Venues like the reference one within `SIMILAR_RADIUS_KM`
    ///
    /// Ordered by same category, then same price tier, then rating
    /// descending, then distance ascending.
    pub async fn find_similar(
        &self,
        venue_id: VenueId,
        limit: usize,
    ) -> AppResult<Vec<SimilarVenue>> {
        let reference = self
            .venues
            .venue_by_id(venue_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venue {} not found", venue_id)))?;

        let bounds = geo::bounds_around(&reference.location, SIMILAR_RADIUS_KM);
        let nearby = self
            .venues
            .venues_sharing_category(reference.category_id, reference.subcategory_id, bounds)
            .await?;

        let mut similar: Vec<SimilarVenue> = nearby
            .into_iter()
            .filter(|v| v.id != reference.id)
            .map(|venue| SimilarVenue {
                distance_km: geo::distance_km(&reference.location, &venue.location),
                venue,
            })
            .filter(|s| s.distance_km <= SIMILAR_RADIUS_KM)
            .collect();

        similar.sort_by(|a, b| similarity_order(&reference, a, b));
        similar.truncate(limit);

        tracing::debug!(venue_id, result_count = similar.len(), "Found similar venues");

        Ok(similar)
    }

    /// Meeting point for the given locations and the venues around it
    ///
    /// Venues are searched within the meeting point's radius (capped at
    /// `MAX_NEARBY_RADIUS_KM`), nearest first with higher ratings breaking
    /// ties. A failed venue lookup is logged and leaves the list empty.
    pub async fn plan_meeting(
        &self,
        locations: &[Coordinate],
        category_id: Option<CategoryId>,
        min_rating: Option<f64>,
    ) -> AppResult<MeetingPlan> {
        if min_rating.is_some_and(|rating| !rating.is_finite()) {
            return Err(AppError::InvalidInput(
                "min_rating must be a finite number".to_string(),
            ));
        }

        let meeting_point = geo::meeting_point(locations)?;
        let center = meeting_point.center;
        let radius_km = meeting_point.search_radius_km.min(MAX_NEARBY_RADIUS_KM);

        let found = match self
            .venues
            .nearby_venues(center, radius_km, category_id, min_rating)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Nearby venue lookup failed, returning no venues");
                Vec::new()
            }
        };

        let mut venues: Vec<NearbyVenue> = found
            .into_iter()
            .map(|venue| NearbyVenue {
                distance_km: geo::distance_km(&center, &venue.location),
                venue,
            })
            .filter(|n| n.distance_km <= radius_km)
            .collect();

        venues.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| b.venue.average_rating.total_cmp(&a.venue.average_rating))
        });
        venues.truncate(NEARBY_VENUE_LIMIT);

        tracing::debug!(
            location_count = locations.len(),
            radius_km,
            result_count = venues.len(),
            "Planned meeting point"
        );

        Ok(MeetingPlan {
            meeting_point,
            venues,
        })
    }

    fn score_with_signal(
        &self,
        venue: &Venue,
        profile: &UserPreferenceProfile,
        context: &RecommendationContext,
        positive_reviews_from_followed: u32,
    ) -> RecommendationResult {
        self.scorer.score(&ScoringInput {
            venue,
            profile,
            context,
            positive_reviews_from_followed,
        })
    }

    /// Positive reviews from followed users, one task per venue.
    ///
    /// Returned in the order of `venues`. A failed lookup yields 0.
    async fn social_signals(&self, venues: &[Venue], profile: &UserPreferenceProfile) -> Vec<u32> {
        let mut signals = vec![0; venues.len()];
        if profile.social_graph.is_empty() {
            return signals;
        }

        let followed: Arc<[UserId]> = profile.social_graph.iter().copied().collect();
        let mut tasks = JoinSet::new();

        for (index, venue) in venues.iter().enumerate() {
            let repository = self.venues.clone();
            let followed = followed.clone();
            let venue_id = venue.id;
            tasks.spawn(async move {
                let count = repository.positive_review_count(venue_id, &followed).await;
                (index, venue_id, count)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(count))) => signals[index] = count,
                Ok((_, venue_id, Err(e))) => {
                    tracing::warn!(venue_id, error = %e, "Social signal lookup failed, using 0");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Social signal task failed");
                }
            }
        }

        signals
    }
}

fn similarity_order(reference: &Venue, a: &SimilarVenue, b: &SimilarVenue) -> Ordering {
    let same_category = |s: &SimilarVenue| s.venue.category_id == reference.category_id;
    let same_tier = |s: &SimilarVenue| {
        reference.price_tier.is_some() && s.venue.price_tier == reference.price_tier
    };

    same_category(b)
        .cmp(&same_category(a))
        .then_with(|| same_tier(b).cmp(&same_tier(a)))
        .then_with(|| b.venue.average_rating.total_cmp(&a.venue.average_rating))
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
}
