use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use city_core::model::StateRecord;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatesResponse {
    pub data: Vec<StateRecord>,
    pub cached: bool,
}

/// Subdivisions for one country, cached per country code.
pub async fn states_for_country(
    State(state): State<Arc<AppState>>,
    Path(country_code): Path<String>,
) -> Result<Json<StatesResponse>, ApiError> {
    let code = country_code.to_uppercase();

    if let Some(cached) = state.states_cache.get(&code) {
        return Ok(Json(StatesResponse {
            data: cached,
            cached: true,
        }));
    }

    let data = state.store.states_for_country(&code).await?;
    state.states_cache.insert(code, data.clone());

    Ok(Json(StatesResponse {
        data,
        cached: false,
    }))
}
