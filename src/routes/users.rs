use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{UserId, UserPreferenceProfile},
    routes::AppState,
};

/// Handler for the extracted preference profile of a user
pub async fn preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<UserPreferenceProfile>> {
    let profile = state.engine.profile(user_id).await?;
    Ok(Json(profile))
}
