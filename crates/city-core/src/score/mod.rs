pub mod distance;
pub mod population;
pub mod text;

pub use text::{FuzzyTextScorer, TextScorer, TrigramTextScorer};

use serde::{Deserialize, Serialize};

/// Blend weights applied to the three component scores.
///
/// The canonical blend leans heavily on text similarity; population breaks
/// ties between same-named places and proximity gives a small local boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub population: f64,
    pub text: f64,
    pub distance: f64,
}

impl ScoreWeights {
    /// Canonical weighting.
    pub const DEFAULT: Self = Self {
        population: 0.2,
        text: 0.7,
        distance: 0.1,
    };

    /// Earlier weighting, kept selectable for comparison.
    pub const LEGACY: Self = Self {
        population: 0.3,
        text: 0.5,
        distance: 0.2,
    };

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::DEFAULT),
            "legacy" => Some(Self::LEGACY),
            _ => None,
        }
    }

    /// Blend component scores into a final score.
    ///
    /// Non-finite components are coerced to zero so a bad record can never
    /// poison the ordering or leak NaN into a response.
    pub fn combine(&self, population_score: f64, text_score: f64, distance_score: f64) -> f64 {
        self.population * sanitize(population_score)
            + self.text * sanitize(text_score)
            + self.distance * sanitize(distance_score)
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Coerce NaN/infinite scores to zero.
pub fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
