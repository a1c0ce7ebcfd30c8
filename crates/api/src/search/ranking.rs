use city_core::model::{City, Location, ScoredCandidate};
use city_core::score::{self, distance, population, ScoreWeights, TextScorer};
use std::cmp::Ordering;

/// Score every candidate and order the full set.
///
/// Ordering happens over the whole fetched candidate set, never the raw
/// store page; pagination is applied afterwards so page N+1 always
/// continues exactly where page N stopped.
pub fn rank(
    candidates: Vec<City>,
    query: &str,
    location: Option<Location>,
    max_population: i64,
    scorer: &dyn TextScorer,
    weights: ScoreWeights,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|city| score_city(city, query, location, max_population, scorer, weights))
        .collect();

    scored.sort_by(compare);
    scored
}

fn score_city(
    city: City,
    query: &str,
    location: Option<Location>,
    max_population: i64,
    scorer: &dyn TextScorer,
    weights: ScoreWeights,
) -> ScoredCandidate {
    let text_score = score::sanitize(scorer.score(&city.name, query));
    let population_score = score::sanitize(population::normalize(city.population, max_population));
    let (distance_score, distance_km) =
        distance::score_for(location, city.latitude, city.longitude);
    let distance_score = score::sanitize(distance_score);

    let final_score = weights.combine(population_score, text_score, distance_score);

    ScoredCandidate {
        city,
        text_score,
        population_score,
        distance_score,
        distance_km,
        final_score,
    }
}

/// Descending by final score; ties broken by population descending
/// (absent last), then by distance ascending (absent last). The sort is
/// stable, so fully tied candidates keep the store's deterministic fetch
/// order.
fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.final_score
        .partial_cmp(&a.final_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.city
                .population
                .unwrap_or(-1)
                .cmp(&a.city.population.unwrap_or(-1))
        })
        .then_with(|| match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Slice one page out of the ranked set.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}
