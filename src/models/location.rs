use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Checks latitude in [-90, 90] and longitude in [-180, 180]
    pub fn validate(&self) -> AppResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::InvalidInput(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::InvalidInput(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Distance between two points expressed in several units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distance {
    pub meters: f64,
    pub kilometers: f64,
    pub miles: f64,
}

/// Axis-aligned bounding box around a point.
///
/// A box whose western edge lies east of its eastern edge wraps across the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBounds {
    pub north_east: Coordinate,
    pub south_west: Coordinate,
}

impl LocationBounds {
    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.longitude > self.north_east.longitude
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        let within_latitude =
            (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude);
        let within_longitude = if self.crosses_antimeridian() {
            point.longitude >= self.south_west.longitude
                || point.longitude <= self.north_east.longitude
        } else {
            (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
        };

        within_latitude && within_longitude
    }
}

/// Central point for a group plus the radius worth searching around it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeetingPoint {
    pub center: Coordinate,
    pub search_radius_km: f64,
}
