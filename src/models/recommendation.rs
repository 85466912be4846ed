use serde::{Deserialize, Serialize};

use super::{Coordinate, MeetingPoint, TimeOfDay, UserId, Venue};
use crate::error::{AppError, AppResult};

/// Request context for a recommendation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub user_id: UserId,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    /// Free-form tag such as "casual", "date", "business"
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub group_size: Option<u32>,
    pub max_distance_km: f64,
    pub limit: usize,
}

impl RecommendationContext {
    pub fn new(user_id: UserId, max_distance_km: f64, limit: usize) -> Self {
        Self {
            user_id,
            location: None,
            time_of_day: None,
            occasion: None,
            group_size: None,
            max_distance_km,
            limit,
        }
    }

    pub fn with_location(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn with_group_size(mut self, group_size: u32) -> Self {
        self.group_size = Some(group_size);
        self
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    /// Rejects contexts the scorer cannot handle meaningfully
    pub fn validate(&self) -> AppResult<()> {
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "max_distance_km must be positive, got {}",
                self.max_distance_km
            )));
        }
        Ok(())
    }
}

/// A scored venue with the reasons that contributed to its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub venue: Venue,
    /// Clamped to [0.0, 1.0]
    pub score: f64,
    /// In evaluation order; duplicates are kept
    pub reasons: Vec<String>,
}

/// A venue similar to a reference venue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarVenue {
    pub venue: Venue,
    pub distance_km: f64,
}

/// A venue within a search radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyVenue {
    pub venue: Venue,
    pub distance_km: f64,
}

/// Meeting point for a group plus the venues around it, nearest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingPlan {
    #[serde(flatten)]
    pub meeting_point: MeetingPoint,
    pub venues: Vec<NearbyVenue>,
}
