use crate::model::Location;

/// Mean Earth radius, kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance at which the proximity score reaches zero.
pub const DECAY_RANGE_KM: f64 = 1000.0;

/// Score used when no client location is known. Distinct from "far away":
/// an unlocatable client must not be penalized relative to a distant one.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Great-circle distance between two coordinate pairs (haversine).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Linear decay from 1.0 at zero distance to 0.0 at [`DECAY_RANGE_KM`],
/// clamped below at zero.
pub fn proximity_score(distance_km: f64) -> f64 {
    (1.0 - distance_km / DECAY_RANGE_KM).max(0.0)
}

/// Proximity score for a candidate given an optional client location.
pub fn score_for(
    location: Option<Location>,
    latitude: f64,
    longitude: f64,
) -> (f64, Option<f64>) {
    match location {
        Some(loc) => {
            let km = distance_km(loc.latitude, loc.longitude, latitude, longitude);
            (proximity_score(km), Some(km))
        }
        None => (NEUTRAL_SCORE, None),
    }
}
