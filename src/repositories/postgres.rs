use sqlx::{postgres::PgRow, types::Json, FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{
        CategoryId, CheckinHistoryRow, Coordinate, LocationBounds, PriceTier,
        RecommendationContext, ReviewHistoryRow, UserId, UserPreferenceProfile, Venue, VenueId,
    },
    repositories::{
        UserHistoryRepository, VenueRepository, CANDIDATE_MIN_RATING, POSITIVE_REVIEW_RATING,
    },
    services::geo,
};

const VENUE_COLUMNS: &str = r#"
    v.id, v.name, v.category_id, v.subcategory_id, v.price_range,
    v.average_rating::float8 AS average_rating,
    v.latitude::float8 AS latitude, v.longitude::float8 AS longitude,
    v.amenities, v.is_featured
"#;

#[derive(Debug, FromRow)]
struct VenueRow {
    id: i64,
    name: String,
    category_id: i64,
    subcategory_id: Option<i64>,
    price_range: Option<String>,
    average_rating: f64,
    latitude: f64,
    longitude: f64,
    amenities: Option<Json<Vec<String>>>,
    is_featured: bool,
}

impl From<VenueRow> for Venue {
    fn from(row: VenueRow) -> Self {
        Venue {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            subcategory_id: row.subcategory_id,
            price_tier: PriceTier::parse_optional(row.price_range.as_deref()),
            average_rating: row.average_rating,
            location: Coordinate {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            amenities: row.amenities.map(|Json(a)| a).unwrap_or_default(),
            is_featured: row.is_featured,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    category_id: i64,
    price_range: Option<String>,
    amenities: Option<Json<Vec<String>>>,
    rating: f64,
    visit_type: Option<String>,
    frequency: i64,
}

impl From<ReviewRow> for ReviewHistoryRow {
    fn from(row: ReviewRow) -> Self {
        ReviewHistoryRow {
            category_id: row.category_id,
            price_tier: PriceTier::parse_optional(row.price_range.as_deref()),
            amenities: row.amenities.map(|Json(a)| a).unwrap_or_default(),
            rating: row.rating,
            visit_type: row.visit_type.filter(|s| !s.is_empty()),
            count: saturating_count(row.frequency),
        }
    }
}

#[derive(Debug, FromRow)]
struct CheckinRow {
    latitude: f64,
    longitude: f64,
    hour: i32,
    frequency: i64,
}

impl From<CheckinRow> for CheckinHistoryRow {
    fn from(row: CheckinRow) -> Self {
        CheckinHistoryRow {
            latitude: row.latitude,
            longitude: row.longitude,
            hour: row.hour.clamp(0, 23) as u32,
            count: saturating_count(row.frequency),
        }
    }
}

/// Narrows a SQL `COUNT(*)` to `u32`, saturating instead of wrapping
fn saturating_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

/// Decodes rows one by one, skipping (and logging) those that do not decode
fn decode_rows<'r, R, T>(rows: &'r [PgRow], what: &'static str) -> Vec<T>
where
    R: FromRow<'r, PgRow>,
    T: From<R>,
{
    rows.iter()
        .filter_map(|row| match R::from_row(row) {
            Ok(decoded) => Some(T::from(decoded)),
            Err(e) => {
                tracing::warn!(error = %e, row_kind = what, "Skipping undecodable row");
                None
            }
        })
        .collect()
}

/// PostgreSQL-backed repository
///
/// Queries the `venues`, `venue_reviews`, `venue_checkins`, `user_follows`
/// and `users` tables. Radius filtering uses a bounding box in SQL followed by
/// an exact Haversine check, so PostGIS is not required.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_bounds(qb: &mut QueryBuilder<'_, Postgres>, bounds: &LocationBounds) {
        qb.push(" AND v.latitude BETWEEN ")
            .push_bind(bounds.south_west.latitude)
            .push(" AND ")
            .push_bind(bounds.north_east.latitude);

        if bounds.crosses_antimeridian() {
            qb.push(" AND (v.longitude >= ")
                .push_bind(bounds.south_west.longitude)
                .push(" OR v.longitude <= ")
                .push_bind(bounds.north_east.longitude)
                .push(")");
        } else {
            qb.push(" AND v.longitude BETWEEN ")
                .push_bind(bounds.south_west.longitude)
                .push(" AND ")
                .push_bind(bounds.north_east.longitude);
        }
    }
}

#[async_trait::async_trait]
impl UserHistoryRepository for PgRepository {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn review_history(&self, user_id: UserId) -> AppResult<Vec<ReviewHistoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT v.category_id, v.price_range, v.amenities,
                   r.overall_rating::float8 AS rating, r.visit_type,
                   COUNT(*) AS frequency
            FROM venue_reviews r
            JOIN venues v ON r.venue_id = v.id
            WHERE r.user_id = $1 AND r.moderation_status = 'approved'
            GROUP BY v.category_id, v.price_range, v.amenities, r.overall_rating, r.visit_type
            ORDER BY frequency DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows::<ReviewRow, _>(&rows, "review_history"))
    }

    async fn checkin_history(&self, user_id: UserId) -> AppResult<Vec<CheckinHistoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT v.latitude::float8 AS latitude, v.longitude::float8 AS longitude,
                   EXTRACT(hour FROM c.created_at)::int4 AS hour,
                   COUNT(*) AS frequency
            FROM venue_checkins c
            JOIN venues v ON c.venue_id = v.id
            WHERE c.user_id = $1
            GROUP BY v.latitude, v.longitude, EXTRACT(hour FROM c.created_at)
            ORDER BY frequency DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows::<CheckinRow, _>(&rows, "checkin_history"))
    }

    async fn follows(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let following: Vec<i64> =
            sqlx::query_scalar("SELECT following_id FROM user_follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(following)
    }
}

#[async_trait::async_trait]
impl VenueRepository for PgRepository {
    async fn venue_by_id(&self, venue_id: VenueId) -> AppResult<Option<Venue>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(VENUE_COLUMNS)
            .push(" FROM venues v WHERE v.id = ")
            .push_bind(venue_id);

        let row = qb
            .build_query_as::<VenueRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Venue::from))
    }

    async fn candidate_venues(
        &self,
        context: &RecommendationContext,
        profile: &UserPreferenceProfile,
        cap: usize,
    ) -> AppResult<Vec<Venue>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT DISTINCT ");
        qb.push(VENUE_COLUMNS)
            .push(" FROM venues v WHERE v.is_active = true AND v.average_rating >= ")
            .push_bind(CANDIDATE_MIN_RATING);

        if let Some(origin) = &context.location {
            Self::push_bounds(&mut qb, &geo::bounds_around(origin, context.max_distance_km));
        }

        qb.push(" AND v.id NOT IN (SELECT venue_id FROM venue_reviews WHERE user_id = ")
            .push_bind(context.user_id)
            .push(")");

        if !profile.category_affinity.is_empty() {
            let category_ids: Vec<CategoryId> =
                profile.category_affinity.keys().copied().collect();
            qb.push(" AND (v.category_id = ANY(")
                .push_bind(category_ids)
                .push(") OR v.is_featured = true)");
        }

        qb.push(" LIMIT ").push_bind(cap as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut venues: Vec<Venue> = decode_rows::<VenueRow, _>(&rows, "candidate_venue");

        // The bounding box over-selects at the corners
        if let Some(origin) = &context.location {
            venues.retain(|v| geo::distance_km(origin, &v.location) <= context.max_distance_km);
        }

        tracing::debug!(
            user_id = context.user_id,
            candidate_count = venues.len(),
            "Loaded candidate venues"
        );

        Ok(venues)
    }

    async fn venues_sharing_category(
        &self,
        category_id: CategoryId,
        subcategory_id: Option<CategoryId>,
        bounds: LocationBounds,
    ) -> AppResult<Vec<Venue>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(VENUE_COLUMNS)
            .push(" FROM venues v WHERE v.is_active = true AND (v.category_id = ")
            .push_bind(category_id)
            .push(" OR v.subcategory_id = ")
            .push_bind(subcategory_id)
            .push(")");
        Self::push_bounds(&mut qb, &bounds);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(decode_rows::<VenueRow, _>(&rows, "similar_venue"))
    }

    async fn nearby_venues(
        &self,
        center: Coordinate,
        radius_km: f64,
        category_id: Option<CategoryId>,
        min_rating: Option<f64>,
    ) -> AppResult<Vec<Venue>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(VENUE_COLUMNS)
            .push(" FROM venues v WHERE v.is_active = true");
        Self::push_bounds(&mut qb, &geo::bounds_around(&center, radius_km));

        if let Some(category_id) = category_id {
            qb.push(" AND v.category_id = ").push_bind(category_id);
        }
        if let Some(min_rating) = min_rating {
            qb.push(" AND v.average_rating >= ").push_bind(min_rating);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut venues: Vec<Venue> = decode_rows::<VenueRow, _>(&rows, "nearby_venue");
        venues.retain(|v| geo::distance_km(&center, &v.location) <= radius_km);

        Ok(venues)
    }

    async fn positive_review_count(
        &self,
        venue_id: VenueId,
        user_ids: &[UserId],
    ) -> AppResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM venue_reviews
            WHERE venue_id = $1 AND user_id = ANY($2) AND overall_rating >= $3
            "#,
        )
        .bind(venue_id)
        .bind(user_ids)
        .bind(POSITIVE_REVIEW_RATING)
        .fetch_one(&self.pool)
        .await?;

        Ok(saturating_count(count))
    }
}
