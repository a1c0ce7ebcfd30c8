use serde::{Deserialize, Serialize};

/// Immutable city reference record.
///
/// Provisioned once by the importer and treated as read-only for the
/// lifetime of the process. `geoname_id` is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub geoname_id: i64,

    pub name: String,

    /// Two-letter ISO country code, uppercase.
    pub country_code: String,

    /// First-level subdivision code (e.g., admin1), if known.
    pub state_code: Option<String>,

    pub state_name: Option<String>,

    pub latitude: f64,

    pub longitude: f64,

    /// Non-negative when present; absent for unpopulated records.
    pub population: Option<i64>,
}

/// A position in degrees, resolved from a client IP or absent entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A subdivision entry served by the filter endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub code: String,
    pub name: String,
}

/// A city plus its component scores for one request.
///
/// Ephemeral: built during ranking, serialized into the response page,
/// never persisted. `distance_km` is kept alongside the score for the
/// distance-ascending tie-break.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub city: City,
    pub text_score: f64,
    pub population_score: f64,
    pub distance_score: f64,
    pub distance_km: Option<f64>,
    pub final_score: f64,
}
