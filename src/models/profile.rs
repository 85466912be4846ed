use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{CategoryId, PriceTier, TimeOfDay, UserId};

/// A frequently visited area derived from check-ins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationCluster {
    pub latitude: f64,
    pub longitude: f64,
    /// Accumulated visit count inside the cell
    pub weight: f64,
    pub radius_km: f64,
}

/// Independently fetched part of a user's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySegment {
    Reviews,
    Checkins,
    Social,
}

impl HistorySegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistorySegment::Reviews => "reviews",
            HistorySegment::Checkins => "checkins",
            HistorySegment::Social => "social",
        }
    }
}

/// Preferences derived from a user's reviews, check-ins and follows.
///
/// Affinity weights are non-negative and not normalized: `category_affinity`
/// values do not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    pub user_id: UserId,
    pub category_affinity: BTreeMap<CategoryId, f64>,
    pub price_affinity: BTreeSet<PriceTier>,
    pub amenity_affinity: BTreeSet<String>,
    pub average_rating_given: f64,
    pub location_clusters: Vec<LocationCluster>,
    pub active_hours: BTreeMap<TimeOfDay, u32>,
    pub social_graph: BTreeSet<UserId>,
    /// Segments whose history query failed and were left empty
    #[serde(default)]
    pub unavailable_segments: Vec<HistorySegment>,
}

impl UserPreferenceProfile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable_segments.is_empty()
    }
}
