//! Storage abstraction consumed by the recommendation core
//!
//! The core never talks to a database directly. It receives these traits as
//! `Arc<dyn _>` so the PostgreSQL implementation, the in-memory
//! implementation and test mocks are interchangeable.

use crate::{
    error::AppResult,
    models::{
        CategoryId, CheckinHistoryRow, Coordinate, LocationBounds, RecommendationContext,
        ReviewHistoryRow, UserId, UserPreferenceProfile, Venue, VenueId,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Minimum average rating for a venue to be a recommendation candidate
pub const CANDIDATE_MIN_RATING: f64 = 3.0;
/// Minimum review rating counted as a positive signal from a followed user
pub const POSITIVE_REVIEW_RATING: f64 = 4.0;

/// Read access to a user's interaction history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserHistoryRepository: Send + Sync {
    /// Whether the user exists at all
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool>;

    /// Approved reviews grouped by (category, price tier, amenities, rating, visit type)
    async fn review_history(&self, user_id: UserId) -> AppResult<Vec<ReviewHistoryRow>>;

    /// Check-ins grouped by (venue latitude, venue longitude, hour of day)
    async fn checkin_history(&self, user_id: UserId) -> AppResult<Vec<CheckinHistoryRow>>;

    /// Identifiers of the users this user follows
    async fn follows(&self, user_id: UserId) -> AppResult<Vec<UserId>>;
}

/// Read access to venues
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VenueRepository: Send + Sync {
    async fn venue_by_id(&self, venue_id: VenueId) -> AppResult<Option<Venue>>;

    /// Coarsely filtered recommendation candidates, at most `cap` of them.
    ///
    /// Implementations return active venues rated at least
    /// `CANDIDATE_MIN_RATING`, within `context.max_distance_km` when the
    /// context carries a location, not yet reviewed by the user, and - when the
    /// profile has category affinities - in one of those categories or featured.
    async fn candidate_venues(
        &self,
        context: &RecommendationContext,
        profile: &UserPreferenceProfile,
        cap: usize,
    ) -> AppResult<Vec<Venue>>;

    /// Active venues in `category_id` or `subcategory_id` located inside `bounds`
    async fn venues_sharing_category(
        &self,
        category_id: CategoryId,
        subcategory_id: Option<CategoryId>,
        bounds: LocationBounds,
    ) -> AppResult<Vec<Venue>>;

    /// Active venues within `radius_km` of `center`, optionally restricted to
    /// one category and a minimum average rating. Unordered.
    async fn nearby_venues(
        &self,
        center: Coordinate,
        radius_km: f64,
        category_id: Option<CategoryId>,
        min_rating: Option<f64>,
    ) -> AppResult<Vec<Venue>>;

    /// Reviews of the venue rated at least `POSITIVE_REVIEW_RATING` by any of `user_ids`
    async fn positive_review_count(&self, venue_id: VenueId, user_ids: &[UserId])
        -> AppResult<u32>;
}
