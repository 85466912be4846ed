use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{SimilarVenue, VenueId},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub venue_id: VenueId,
    pub similar: Vec<SimilarVenue>,
    pub count: usize,
}

/// Handler for venues similar to the given one
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<VenueId>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<SimilarResponse>> {
    let similar = state
        .engine
        .find_similar(venue_id, state.limit(query.limit))
        .await?;

    Ok(Json(SimilarResponse {
        venue_id,
        count: similar.len(),
        similar,
    }))
}
