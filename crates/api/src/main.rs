use anyhow::Result;
use axum::{routing::get, Router};
use city_core::model::StateRecord;
use city_core::{CityStore, Config, SystemClock, TextScorer, TtlCache};
use geoip_client::GeoIpClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod geolocate;
mod routes;
mod search;

use geolocate::GeolocationResolver;
use routes::filters::FiltersResponse;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub store: CityStore,
    pub resolver: GeolocationResolver,
    pub scorer: Arc<dyn TextScorer>,
    /// Largest stored population, scanned once at startup.
    pub max_population: i64,
    pub filters_cache: TtlCache<(), FiltersResponse>,
    pub states_cache: TtlCache<String, Vec<StateRecord>>,
}

/// Build the router; split out so tests can drive it without a listener.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/cities", get(routes::search::search))
        .route("/cities/filters", get(routes::filters::filters))
        .route(
            "/cities/states/{country_code}",
            get(routes::states::states_for_country),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    info!(database_url = %config.database_url, "Connecting to city store");
    let store = CityStore::connect(&config.database_url).await?;

    let city_count = store.city_count().await?;
    let max_population = store.max_population().await?.unwrap_or(0).max(1);
    info!(cities = city_count, max_population, "City store loaded");

    let clock = Arc::new(SystemClock);
    let resolver = GeolocationResolver::new(
        GeoIpClient::new(&config.geoip_api_url, config.geoip_timeout())?,
        TtlCache::new(config.cache_ttl(), clock.clone()),
        config.default_location,
    );

    let state = Arc::new(AppState {
        scorer: config.text_scorer.build(),
        store,
        resolver,
        max_population,
        filters_cache: TtlCache::new(config.cache_ttl(), clock.clone()),
        states_cache: TtlCache::new(config.cache_ttl(), clock),
        config,
    });

    let addr = format!("0.0.0.0:{}", state.config.api_port);
    info!(address = addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use city_core::model::City;
    use std::time::Duration;

    /// AppState over a throwaway SQLite file seeded with `cities`. The
    /// TempDir must stay alive for the duration of the test.
    pub(crate) async fn state_with_cities(
        cities: Vec<City>,
    ) -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/cities.db?mode=rwc", dir.path().display());

        let store = CityStore::connect(&url).await.unwrap();
        store.init_schema().await.unwrap();
        store.insert_batch(&cities).await.unwrap();

        let config = Config::test();
        let max_population = store.max_population().await.unwrap().unwrap_or(0).max(1);

        let resolver = GeolocationResolver::new(
            GeoIpClient::new(&config.geoip_api_url, Duration::from_millis(100)).unwrap(),
            TtlCache::new(config.cache_ttl(), Arc::new(SystemClock)),
            config.default_location,
        );

        let state = Arc::new(AppState {
            scorer: config.text_scorer.build(),
            store,
            resolver,
            max_population,
            filters_cache: TtlCache::new(config.cache_ttl(), Arc::new(SystemClock)),
            states_cache: TtlCache::new(config.cache_ttl(), Arc::new(SystemClock)),
            config,
        });

        (state, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::state_with_cities;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode};
    use city_core::model::City;
    use tower::ServiceExt;

    fn test_app(state: Arc<AppState>) -> Router {
        app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3000))))
    }

    fn paris() -> City {
        City {
            geoname_id: 2988507,
            name: "Paris".to_string(),
            country_code: "FR".to_string(),
            state_code: Some("11".to_string()),
            state_name: Some("Île-de-France".to_string()),
            latitude: 48.85341,
            longitude: 2.3488,
            population: Some(2_138_551),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_query_is_bad_request() {
        let (state, _dir) = state_with_cities(vec![paris()]).await;

        let response = test_app(state)
            .oneshot(Request::get("/cities").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_response_shape() {
        let (state, _dir) = state_with_cities(vec![paris()]).await;

        let response = test_app(state)
            .oneshot(
                Request::get("/cities?query=paris")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["data"][0]["city_name"], "Paris");
        assert_eq!(body["data"][0]["geoname_id"], 2988507);
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["hasMore"], false);
        assert!(body["data"][0]["score"].as_f64().unwrap() > 0.9);
    }

    #[tokio::test]
    async fn test_filters_and_states_routes() {
        let (state, _dir) = state_with_cities(vec![paris()]).await;

        let response = test_app(state.clone())
            .oneshot(
                Request::get("/cities/filters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["countries"][0]["code"], "FR");

        let response = test_app(state)
            .oneshot(
                Request::get("/cities/states/FR")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["code"], "11");
    }

    #[tokio::test]
    async fn test_health_route() {
        let (state, _dir) = state_with_cities(vec![paris()]).await;

        let response = test_app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cities"], 1);
    }
}
