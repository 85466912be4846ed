use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{CategoryId, Coordinate, Distance, LocationBounds, MeetingPlan},
    routes::AppState,
    services::geo,
};

#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_lat: f64,
    pub to_lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct BoundsQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct MeetingPointRequest {
    pub locations: Vec<Coordinate>,
    pub category_id: Option<CategoryId>,
    pub min_rating: Option<f64>,
}

pub async fn distance(Query(query): Query<DistanceQuery>) -> AppResult<Json<Distance>> {
    let from = Coordinate::new(query.from_lat, query.from_lng)?;
    let to = Coordinate::new(query.to_lat, query.to_lng)?;
    Ok(Json(geo::distance_between(&from, &to)))
}

pub async fn bounds(Query(query): Query<BoundsQuery>) -> AppResult<Json<LocationBounds>> {
    let center = Coordinate::new(query.lat, query.lng)?;
    if !query.radius_km.is_finite() || query.radius_km <= 0.0 {
        return Err(AppError::InvalidInput(
            "radius_km must be positive".to_string(),
        ));
    }
    Ok(Json(geo::bounds_around(&center, query.radius_km)))
}

/// Centroid of the given locations, a search radius around it and the venues within
pub async fn meeting_point(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MeetingPointRequest>,
) -> AppResult<Json<MeetingPlan>> {
    let plan = state
        .engine
        .plan_meeting(&request.locations, request.category_id, request.min_rating)
        .await?;
    Ok(Json(plan))
}
