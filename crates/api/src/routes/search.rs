use crate::error::ApiError;
use crate::search::ranking;
use crate::AppState;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use city_core::model::ScoredCandidate;
use city_core::store::CandidateFilter;
use city_core::Location;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Hard ceiling on the client-requested page size.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,

    #[serde(default)]
    pub offset: Option<usize>,

    pub limit: Option<usize>,

    /// Two-letter country filter.
    pub country_code: Option<String>,

    pub state_code: Option<String>,

    /// Rank with the client's IP-derived location.
    #[serde(default, rename = "useLocation")]
    pub use_location: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub data: Vec<CityResult>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CityResult {
    pub geoname_id: i64,
    pub city_name: String,
    pub country_code: String,
    pub state_code: Option<String>,
    pub state_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub population: Option<i64>,
    pub score: f64,
}

impl From<ScoredCandidate> for CityResult {
    fn from(scored: ScoredCandidate) -> Self {
        let city = scored.city;
        Self {
            geoname_id: city.geoname_id,
            city_name: city.name,
            country_code: city.country_code,
            state_code: city.state_code,
            state_name: city.state_name,
            latitude: city.latitude,
            longitude: city.longitude,
            population: city.population,
            score: scored.final_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
    pub total: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// City search endpoint.
pub async fn search(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.query.as_deref().map(str::trim).unwrap_or("");
    if query.is_empty() {
        return Err(ApiError::QueryRequired);
    }

    let location = if params.use_location {
        let ip = client_ip(&headers, addr);
        let (location, kind) = state.resolver.resolve(&ip).await;
        debug!(ip = %ip, ?kind, "Resolved client location");
        Some(location)
    } else {
        None
    };

    let response = execute_search(&state, query, &params, location).await?;
    Ok(Json(response))
}

/// Execute the actual search: pre-filter in the store, score and order in
/// process, then slice the requested page.
async fn execute_search(
    state: &AppState,
    query: &str,
    params: &SearchParams,
    location: Option<Location>,
) -> Result<SearchResponse, ApiError> {
    let filter = CandidateFilter {
        country_code: params.country_code.as_deref().map(str::to_uppercase),
        state_code: params.state_code.clone(),
    };

    let candidates = state
        .store
        .search_candidates(query, &filter, state.config.candidate_cap)
        .await?;
    let total = state.store.count_matches(query, &filter).await?;

    let scored = ranking::rank(
        candidates,
        query,
        location,
        state.max_population,
        state.scorer.as_ref(),
        state.config.weights,
    );

    let offset = params.offset.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(state.config.page_size)
        .clamp(1, MAX_PAGE_SIZE);

    let page = ranking::paginate(scored, offset, limit);
    let data: Vec<CityResult> = page.into_iter().map(CityResult::from).collect();
    let has_more = offset + data.len() < total as usize;

    Ok(SearchResponse {
        data,
        pagination: Pagination {
            offset,
            limit,
            total,
            has_more,
        },
    })
}

/// Client IP from the proxy header, falling back to the socket address.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}
