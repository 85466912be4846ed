//! Great-circle distance, bounding boxes and meeting points.

use crate::{
    error::{AppError, AppResult},
    models::{Coordinate, Distance, LocationBounds, MeetingPoint},
};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
const METERS_PER_MILE: f64 = 1609.344;
const KM_PER_DEGREE_LATITUDE: f64 = 111.0;
const MIN_MEETING_RADIUS_KM: f64 = 5.0;
const MEETING_RADIUS_BUFFER: f64 = 1.2;

/// Haversine distance in kilometers between two points given in degrees
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine distance in kilometers between two coordinates
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_km(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Distance between two coordinates in meters, kilometers and miles
pub fn distance_between(from: &Coordinate, to: &Coordinate) -> Distance {
    let kilometers = distance_km(from, to);
    let meters = kilometers * 1000.0;

    Distance {
        meters,
        kilometers,
        miles: meters / METERS_PER_MILE,
    }
}

/// Approximate bounding box of `radius_km` around `center`.
///
/// Uses a flat 111 km per degree of latitude and scales longitude by the
/// cosine of the center latitude. Latitudes are clamped to the poles. A box
/// reaching a pole, or wider than the globe, spans every longitude; one
/// crossing ±180° is returned wrapped (western edge east of the eastern edge).
pub fn bounds_around(center: &Coordinate, radius_km: f64) -> LocationBounds {
    let lat_offset = radius_km / KM_PER_DEGREE_LATITUDE;
    let north = center.latitude + lat_offset;
    let south = center.latitude - lat_offset;
    let lng_offset = radius_km / (KM_PER_DEGREE_LATITUDE * center.latitude.to_radians().cos());

    let spans_globe = !lng_offset.is_finite() || lng_offset >= 180.0;
    let (west, east) = if north >= 90.0 || south <= -90.0 || spans_globe {
        (-180.0, 180.0)
    } else {
        (
            wrap_longitude(center.longitude - lng_offset),
            wrap_longitude(center.longitude + lng_offset),
        )
    };

    LocationBounds {
        north_east: Coordinate {
            latitude: north.min(90.0),
            longitude: east,
        },
        south_west: Coordinate {
            latitude: south.max(-90.0),
            longitude: west,
        },
    }
}

/// Brings a longitude less than one turn out of range back into [-180, 180]
fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else if longitude < -180.0 {
        longitude + 360.0
    } else {
        longitude
    }
}

/// Centroid of the given points and a radius covering all of them
pub fn meeting_point(points: &[Coordinate]) -> AppResult<MeetingPoint> {
    if points.is_empty() {
        return Err(AppError::InvalidInput("No locations provided".to_string()));
    }
    for point in points {
        point.validate()?;
    }

    let count = points.len() as f64;
    let center = Coordinate {
        latitude: points.iter().map(|p| p.latitude).sum::<f64>() / count,
        longitude: points.iter().map(|p| p.longitude).sum::<f64>() / count,
    };

    let farthest = points
        .iter()
        .map(|p| distance_km(&center, p))
        .fold(0.0_f64, f64::max);

    Ok(MeetingPoint {
        center,
        search_radius_km: (farthest * MEETING_RADIUS_BUFFER).max(MIN_MEETING_RADIUS_KM),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_nearby_san_francisco_points() {
        let d = haversine_km(37.7749, -122.4194, 37.7849, -122.4094);
        assert!(d > 0.0);
        assert!(d < 5.0);
        // ~1.41 km
        assert!((d - 1.41).abs() < 0.05);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = coord(51.5074, -0.1278);
        let b = coord(48.8566, 2.3522);
        let ab = distance_km(&a, &b);
        let ba = distance_km(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
        // London to Paris is roughly 344 km
        assert!((ab - 343.5).abs() < 2.0);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = coord(-33.8688, 151.2093);
        assert!(distance_km(&a, &a).abs() < 1e-9);
    }

    #[test]
    fn test_distance_units() {
        let d = distance_between(&coord(0.0, 0.0), &coord(0.0, 1.0));
        assert!((d.meters - d.kilometers * 1000.0).abs() < 1e-6);
        assert!((d.miles - d.meters / 1609.344).abs() < 1e-9);
        // One degree of longitude on the equator
        assert!((d.kilometers - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_bounds_around_contains_center_and_scales_longitude() {
        let center = coord(60.0, 10.0);
        let bounds = bounds_around(&center, 10.0);
        assert!(bounds.contains(&center));

        let lat_span = bounds.north_east.latitude - bounds.south_west.latitude;
        let lng_span = bounds.north_east.longitude - bounds.south_west.longitude;
        // cos(60°) = 0.5, so longitude span is twice the latitude span
        assert!((lng_span - 2.0 * lat_span).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_around_wraps_across_antimeridian() {
        let center = coord(10.0, 179.99);
        let bounds = bounds_around(&center, 5.0);

        assert!(bounds.crosses_antimeridian());
        assert!(bounds.south_west.longitude > 179.9);
        assert!(bounds.north_east.longitude < -179.9);
        assert!(bounds.contains(&center));
        assert!(bounds.contains(&coord(10.0, -179.99)));
        assert!(!bounds.contains(&coord(10.0, 0.0)));

        let west = bounds_around(&coord(10.0, -179.99), 5.0);
        assert!(west.crosses_antimeridian());
        assert!(west.contains(&coord(10.0, 179.99)));
    }

    #[test]
    fn test_bounds_around_pole_spans_all_longitudes() {
        let bounds = bounds_around(&coord(89.99, 45.0), 5.0);
        assert_eq!(bounds.north_east.latitude, 90.0);
        assert_eq!(bounds.south_west.longitude, -180.0);
        assert_eq!(bounds.north_east.longitude, 180.0);
        assert!(bounds.contains(&coord(89.98, -135.0)));
    }

    #[test]
    fn test_meeting_point_centroid() {
        let points = [coord(0.0, 0.0), coord(0.0, 0.2)];
        let meeting = meeting_point(&points).unwrap();
        assert!((meeting.center.latitude).abs() < 1e-12);
        assert!((meeting.center.longitude - 0.1).abs() < 1e-12);
        // Farthest point ~11.1 km away, buffered by 20%
        assert!((meeting.search_radius_km - 11.119 * 1.2).abs() < 0.05);
    }

    #[test]
    fn test_meeting_point_minimum_radius() {
        let points = [coord(37.7749, -122.4194)];
        let meeting = meeting_point(&points).unwrap();
        assert_eq!(meeting.search_radius_km, 5.0);
    }

    #[test]
    fn test_meeting_point_requires_points() {
        assert!(matches!(meeting_point(&[]), Err(AppError::InvalidInput(_))));
    }
}
