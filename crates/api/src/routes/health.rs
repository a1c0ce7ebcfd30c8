use crate::error::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cities: i64,
    pub geo_cache_entries: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let cities = state.store.city_count().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        cities,
        geo_cache_entries: state.resolver.cache_len(),
    }))
}
