use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Coordinate, RecommendationContext, RecommendationResult, TimeOfDay, UserId},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: UserId,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub time_of_day: Option<TimeOfDay>,
    pub occasion: Option<String>,
    pub group_size: Option<u32>,
    pub max_distance_km: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<RecommendationResult>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationQuery {
    /// Builds the engine context, applying configured defaults
    pub fn into_context(self, state: &AppState) -> AppResult<RecommendationContext> {
        let limit = state.limit(self.limit);
        let max_distance_km = self
            .max_distance_km
            .unwrap_or(state.config.default_max_distance_km);

        let mut context = RecommendationContext::new(self.user_id, max_distance_km, limit);
        context.location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(AppError::InvalidInput(
                    "lat and lng must be provided together".to_string(),
                ))
            }
        };
        context.time_of_day = self.time_of_day;
        context.occasion = self.occasion.filter(|o| !o.trim().is_empty());
        context.group_size = self.group_size;

        Ok(context)
    }
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let context = query.into_context(&state)?;

    tracing::info!(
        request_id = %request_id,
        user_id = context.user_id,
        has_location = context.location.is_some(),
        limit = context.limit,
        "Processing recommendation request"
    );

    let recommendations = state.engine.recommend(&context).await?;

    Ok(Json(RecommendationResponse {
        user_id: context.user_id,
        count: recommendations.len(),
        recommendations,
        generated_at: Utc::now(),
    }))
}
