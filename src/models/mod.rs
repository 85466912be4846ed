use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod location;
pub mod profile;
pub mod recommendation;

pub use location::{Coordinate, Distance, LocationBounds, MeetingPoint};
pub use profile::{HistorySegment, LocationCluster, UserPreferenceProfile};
pub use recommendation::{
    MeetingPlan, NearbyVenue, RecommendationContext, RecommendationResult, SimilarVenue,
};

pub type UserId = i64;
pub type VenueId = i64;
pub type CategoryId = i64;

/// Price tier of a venue, ordered from cheapest to most expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Upscale,
    #[serde(rename = "$$$$")]
    Luxury,
}

impl PriceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTier::Budget => "$",
            PriceTier::Moderate => "$$",
            PriceTier::Upscale => "$$$",
            PriceTier::Luxury => "$$$$",
        }
    }

    /// Parses the stored representation; empty or unknown strings mean "no tier"
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|s| s.parse().ok())
    }
}

impl Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "$" => Ok(PriceTier::Budget),
            "$$" => Ok(PriceTier::Moderate),
            "$$$" => Ok(PriceTier::Upscale),
            "$$$$" => Ok(PriceTier::Luxury),
            other => Err(format!("unknown price tier: {:?}", other)),
        }
    }
}

/// Coarse time-of-day bucket derived from an hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// [0,6) night, [6,12) morning, [12,17) afternoon, [17,24) evening
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "night",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A venue as seen by the recommendation core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub subcategory_id: Option<CategoryId>,
    #[serde(default)]
    pub price_tier: Option<PriceTier>,
    /// 0.0 to 5.0
    pub average_rating: f64,
    pub location: Coordinate,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
}

/// One grouped row of a user's approved reviews
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewHistoryRow {
    pub category_id: CategoryId,
    pub price_tier: Option<PriceTier>,
    pub amenities: Vec<String>,
    pub rating: f64,
    pub visit_type: Option<String>,
    /// Number of reviews sharing this row's values
    pub count: u32,
}

/// One grouped row of a user's check-ins (venue coordinates and hour)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckinHistoryRow {
    pub latitude: f64,
    pub longitude: f64,
    /// Hour of day, 0 to 23
    pub hour: u32,
    pub count: u32,
}
