//! Geographic utilities: great-circle distance and path length.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Calculate haversine distance between two GPS points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a path in meters (sum of consecutive haversine segments).
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Mean earth radius used by `geo`'s haversine metric.
pub const MEAN_EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Offset a point northwards by `meters` along its meridian.
pub fn offset_north(point: &GpsPoint, meters: f64) -> GpsPoint {
    let delta_lat = (meters / MEAN_EARTH_RADIUS_METERS).to_degrees();
    GpsPoint::new(point.latitude + delta_lat, point.longitude)
}
