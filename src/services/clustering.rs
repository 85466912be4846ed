//! Coordinate-rounding spatial hash for grouping check-ins.
//!
//! Coordinates are rounded to two decimal places (~1.1 km at the equator).
//! Cell size shrinks in longitude away from the equator; this is a known
//! approximation.

use std::collections::HashMap;

use crate::models::LocationCluster;

/// Radius attached to every emitted cluster
pub const CLUSTER_RADIUS_KM: f64 = 2.0;
/// Clusters lighter than this are discarded
pub const MIN_CLUSTER_WEIGHT: f64 = 2.0;

/// Grid cell identified by coordinates formatted to two decimal places
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterKey {
    lat_cell: String,
    lng_cell: String,
}

impl ClusterKey {
    /// Rounds the stored value itself. Scaling by 100 first would move
    /// half-boundary values such as 37.775 (stored as 37.77499..) up a cell.
    pub fn for_point(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_cell: format!("{:.2}", latitude),
            lng_cell: format!("{:.2}", longitude),
        }
    }
}

/// Accumulates weighted points into grid cells.
///
/// Each cell keeps the coordinate of the first point that landed in it, and
/// cells are emitted in first-seen order.
#[derive(Debug, Default)]
pub struct ClusterAccumulator {
    index: HashMap<ClusterKey, usize>,
    clusters: Vec<LocationCluster>,
}

impl ClusterAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, latitude: f64, longitude: f64, weight: f64) {
        let key = ClusterKey::for_point(latitude, longitude);
        match self.index.get(&key) {
            Some(&position) => self.clusters[position].weight += weight,
            None => {
                self.index.insert(key, self.clusters.len());
                self.clusters.push(LocationCluster {
                    latitude,
                    longitude,
                    weight,
                    radius_km: CLUSTER_RADIUS_KM,
                });
            }
        }
    }

    /// Clusters with weight of at least `MIN_CLUSTER_WEIGHT`
    pub fn into_clusters(self) -> Vec<LocationCluster> {
        self.clusters
            .into_iter()
            .filter(|c| c.weight >= MIN_CLUSTER_WEIGHT)
            .collect()
    }
}
