use crate::error::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use city_core::model::StateRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct FiltersResponse {
    pub countries: Vec<CountryEntry>,

    /// States grouped by country code.
    pub states: BTreeMap<String, Vec<StateRecord>>,

    /// Whether this response was served from the cache. Reported for
    /// observability only; the data is identical either way.
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryEntry {
    pub code: String,
}

/// Distinct countries and states available as search filters.
pub async fn filters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FiltersResponse>, ApiError> {
    if let Some(mut cached) = state.filters_cache.get(&()) {
        cached.cached = true;
        return Ok(Json(cached));
    }

    let countries = state.store.distinct_countries().await?;
    let state_rows = state.store.all_states().await?;

    let mut states: BTreeMap<String, Vec<StateRecord>> = BTreeMap::new();
    for (country_code, record) in state_rows {
        states.entry(country_code).or_default().push(record);
    }

    let response = FiltersResponse {
        countries: countries
            .into_iter()
            .map(|code| CountryEntry { code })
            .collect(),
        states,
        cached: false,
    };

    state.filters_cache.insert((), response.clone());
    Ok(Json(response))
}
