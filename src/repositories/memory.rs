use std::collections::{BTreeMap, HashSet};

use crate::{
    error::AppResult,
    models::{
        CategoryId, CheckinHistoryRow, Coordinate, LocationBounds, RecommendationContext,
        ReviewHistoryRow, UserId, UserPreferenceProfile, Venue, VenueId,
    },
    repositories::{
        UserHistoryRepository, VenueRepository, CANDIDATE_MIN_RATING, POSITIVE_REVIEW_RATING,
    },
    services::geo,
};

#[derive(Debug, Clone)]
struct ReviewRecord {
    user_id: UserId,
    venue_id: VenueId,
    rating: f64,
    visit_type: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct CheckinRecord {
    user_id: UserId,
    venue_id: VenueId,
    hour: u32,
}

/// Repository backed by plain collections
///
/// Answers the same queries as the PostgreSQL repository, grouping raw reviews
/// and check-ins the way the SQL `GROUP BY` does. Used for tests and for
/// running the service without a database.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    venues: BTreeMap<VenueId, Venue>,
    users: HashSet<UserId>,
    reviews: Vec<ReviewRecord>,
    checkins: Vec<CheckinRecord>,
    follows: Vec<(UserId, UserId)>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user_id: UserId) {
        self.users.insert(user_id);
    }

    pub fn add_venue(&mut self, venue: Venue) {
        self.venues.insert(venue.id, venue);
    }

    pub fn add_review(
        &mut self,
        user_id: UserId,
        venue_id: VenueId,
        rating: f64,
        visit_type: Option<&str>,
    ) {
        self.users.insert(user_id);
        self.reviews.push(ReviewRecord {
            user_id,
            venue_id,
            rating,
            visit_type: visit_type.map(str::to_string),
        });
    }

    pub fn add_checkin(&mut self, user_id: UserId, venue_id: VenueId, hour: u32) {
        self.users.insert(user_id);
        self.checkins.push(CheckinRecord {
            user_id,
            venue_id,
            hour,
        });
    }

    pub fn add_follow(&mut self, follower_id: UserId, following_id: UserId) {
        self.users.insert(follower_id);
        self.users.insert(following_id);
        if !self.follows.contains(&(follower_id, following_id)) {
            self.follows.push((follower_id, following_id));
        }
    }

    fn reviewed_by(&self, user_id: UserId) -> HashSet<VenueId> {
        self.reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.venue_id)
            .collect()
    }
}

#[async_trait::async_trait]
impl UserHistoryRepository for InMemoryRepository {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.users.contains(&user_id))
    }

    async fn review_history(&self, user_id: UserId) -> AppResult<Vec<ReviewHistoryRow>> {
        let mut rows: Vec<ReviewHistoryRow> = Vec::new();

        for review in self.reviews.iter().filter(|r| r.user_id == user_id) {
            let Some(venue) = self.venues.get(&review.venue_id) else {
                continue;
            };

            let existing = rows.iter_mut().find(|row| {
                row.category_id == venue.category_id
                    && row.price_tier == venue.price_tier
                    && row.amenities == venue.amenities
                    && row.rating == review.rating
                    && row.visit_type == review.visit_type
            });

            match existing {
                Some(row) => row.count = row.count.saturating_add(1),
                None => rows.push(ReviewHistoryRow {
                    category_id: venue.category_id,
                    price_tier: venue.price_tier,
                    amenities: venue.amenities.clone(),
                    rating: review.rating,
                    visit_type: review.visit_type.clone(),
                    count: 1,
                }),
            }
        }

        rows.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(rows)
    }

    async fn checkin_history(&self, user_id: UserId) -> AppResult<Vec<CheckinHistoryRow>> {
        let mut rows: Vec<CheckinHistoryRow> = Vec::new();

        for checkin in self.checkins.iter().filter(|c| c.user_id == user_id) {
            let Some(venue) = self.venues.get(&checkin.venue_id) else {
                continue;
            };
            let location = venue.location;

            let existing = rows.iter_mut().find(|row| {
                row.latitude == location.latitude
                    && row.longitude == location.longitude
                    && row.hour == checkin.hour
            });

            match existing {
                Some(row) => row.count = row.count.saturating_add(1),
                None => rows.push(CheckinHistoryRow {
                    latitude: location.latitude,
                    longitude: location.longitude,
                    hour: checkin.hour,
                    count: 1,
                }),
            }
        }

        rows.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(rows)
    }

    async fn follows(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        Ok(self
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, following)| *following)
            .collect())
    }
}

#[async_trait::async_trait]
impl VenueRepository for InMemoryRepository {
    async fn venue_by_id(&self, venue_id: VenueId) -> AppResult<Option<Venue>> {
        Ok(self.venues.get(&venue_id).cloned())
    }

    async fn candidate_venues(
        &self,
        context: &RecommendationContext,
        profile: &UserPreferenceProfile,
        cap: usize,
    ) -> AppResult<Vec<Venue>> {
        let reviewed = self.reviewed_by(context.user_id);

        Ok(self
            .venues
            .values()
            .filter(|v| v.average_rating >= CANDIDATE_MIN_RATING)
            .filter(|v| !reviewed.contains(&v.id))
            .filter(|v| match &context.location {
                Some(origin) => geo::distance_km(origin, &v.location) <= context.max_distance_km,
                None => true,
            })
            .filter(|v| {
                profile.category_affinity.is_empty()
                    || v.is_featured
                    || profile.category_affinity.contains_key(&v.category_id)
            })
            .take(cap)
            .cloned()
            .collect())
    }

    async fn venues_sharing_category(
        &self,
        category_id: CategoryId,
        subcategory_id: Option<CategoryId>,
        bounds: LocationBounds,
    ) -> AppResult<Vec<Venue>> {
        Ok(self
            .venues
            .values()
            .filter(|v| {
                v.category_id == category_id
                    || (subcategory_id.is_some() && v.subcategory_id == subcategory_id)
            })
            .filter(|v| bounds.contains(&v.location))
            .cloned()
            .collect())
    }

    async fn nearby_venues(
        &self,
        center: Coordinate,
        radius_km: f64,
        category_id: Option<CategoryId>,
        min_rating: Option<f64>,
    ) -> AppResult<Vec<Venue>> {
        let bounds = geo::bounds_around(&center, radius_km);

        Ok(self
            .venues
            .values()
            .filter(|v| category_id.map_or(true, |id| v.category_id == id))
            .filter(|v| min_rating.map_or(true, |rating| v.average_rating >= rating))
            .filter(|v| bounds.contains(&v.location))
            .filter(|v| geo::distance_km(&center, &v.location) <= radius_km)
            .cloned()
            .collect())
    }

    async fn positive_review_count(
        &self,
        venue_id: VenueId,
        user_ids: &[UserId],
    ) -> AppResult<u32> {
        let count = self
            .reviews
            .iter()
            .filter(|r| r.venue_id == venue_id)
            .filter(|r| user_ids.contains(&r.user_id))
            .filter(|r| r.rating >= POSITIVE_REVIEW_RATING)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceTier;

    fn venue(id: VenueId, category_id: CategoryId, rating: f64, lat: f64, lng: f64) -> Venue {
        Venue {
            id,
            name: format!("Venue {}", id),
            category_id,
            subcategory_id: None,
            price_tier: Some(PriceTier::Moderate),
            average_rating: rating,
            location: Coordinate {
                latitude: lat,
                longitude: lng,
            },
            amenities: vec!["wifi".to_string()],
            is_featured: false,
        }
    }

    #[test]
    fn test_review_history_groups_identical_rows() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 0.0, 0.0));
        repo.add_venue(venue(2, 7, 4.0, 0.0, 0.0));
        repo.add_review(10, 1, 5.0, Some("dinner"));
        repo.add_review(10, 2, 5.0, Some("dinner"));
        repo.add_review(10, 1, 4.0, None);

        let rows = tokio_test::block_on(repo.review_history(10)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].rating, 5.0);
        assert_eq!(rows[1].count, 1);
    }

    #[test]
    fn test_checkin_history_groups_by_location_and_hour() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 10.0, 10.0));
        repo.add_checkin(10, 1, 19);
        repo.add_checkin(10, 1, 19);
        repo.add_checkin(10, 1, 8);

        let rows = tokio_test::block_on(repo.checkin_history(10)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hour, 19);
        assert_eq!(rows[0].count, 2);
    }

    #[tokio::test]
    async fn test_candidates_exclude_reviewed_low_rated_and_distant() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 37.7749, -122.4194));
        repo.add_venue(venue(2, 7, 2.5, 37.7749, -122.4194));
        repo.add_venue(venue(3, 7, 4.5, 37.7749, -122.4194));
        repo.add_venue(venue(4, 7, 4.5, 40.7128, -74.0060));
        repo.add_review(10, 3, 4.0, None);

        let ctx = RecommendationContext::new(10, 10.0, 10).with_location(Coordinate {
            latitude: 37.7749,
            longitude: -122.4194,
        });
        let profile = UserPreferenceProfile::empty(10);

        let candidates = repo.candidate_venues(&ctx, &profile, 200).await.unwrap();
        let ids: Vec<VenueId> = candidates.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_candidates_restricted_to_preferred_categories_or_featured() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 0.0, 0.0));
        repo.add_venue(venue(2, 8, 4.5, 0.0, 0.0));
        let mut featured = venue(3, 9, 4.5, 0.0, 0.0);
        featured.is_featured = true;
        repo.add_venue(featured);

        let ctx = RecommendationContext::new(10, 10.0, 10);
        let mut profile = UserPreferenceProfile::empty(10);
        profile.category_affinity.insert(7, 1.0);

        let candidates = repo.candidate_venues(&ctx, &profile, 200).await.unwrap();
        let ids: Vec<VenueId> = candidates.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let capped = repo.candidate_venues(&ctx, &profile, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_nearby_venues_applies_radius_and_filters() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 37.7750, -122.4190));
        repo.add_venue(venue(2, 2, 4.2, 37.7700, -122.4200));
        repo.add_venue(venue(3, 7, 3.0, 37.7800, -122.4150));
        repo.add_venue(venue(4, 7, 4.9, 40.7128, -74.0060));
        let center = Coordinate {
            latitude: 37.7749,
            longitude: -122.4194,
        };

        let ids = |venues: Vec<Venue>| venues.iter().map(|v| v.id).collect::<Vec<_>>();

        let all = repo.nearby_venues(center, 5.0, None, None).await.unwrap();
        assert_eq!(ids(all), vec![1, 2, 3]);

        let category = repo.nearby_venues(center, 5.0, Some(7), None).await.unwrap();
        assert_eq!(ids(category), vec![1, 3]);

        let rated = repo
            .nearby_venues(center, 5.0, Some(7), Some(4.0))
            .await
            .unwrap();
        assert_eq!(ids(rated), vec![1]);
    }

    #[tokio::test]
    async fn test_nearby_venues_across_antimeridian() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 10.0, -179.99));
        repo.add_venue(venue(2, 7, 4.5, 10.0, 179.98));
        repo.add_venue(venue(3, 7, 4.5, 10.0, 0.0));
        let center = Coordinate {
            latitude: 10.0,
            longitude: 179.99,
        };

        let nearby = repo.nearby_venues(center, 5.0, None, None).await.unwrap();
        let ids: Vec<VenueId> = nearby.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_positive_review_count_only_counts_followed_high_ratings() {
        let mut repo = InMemoryRepository::new();
        repo.add_venue(venue(1, 7, 4.5, 0.0, 0.0));
        repo.add_review(20, 1, 5.0, None);
        repo.add_review(21, 1, 3.5, None);
        repo.add_review(22, 1, 4.0, None);

        let count = repo.positive_review_count(1, &[20, 21]).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_follows_and_user_exists() {
        let mut repo = InMemoryRepository::new();
        repo.add_follow(1, 2);
        repo.add_follow(1, 3);
        repo.add_follow(1, 2);

        assert_eq!(repo.follows(1).await.unwrap(), vec![2, 3]);
        assert!(repo.user_exists(3).await.unwrap());
        assert!(!repo.user_exists(99).await.unwrap());
    }
}
