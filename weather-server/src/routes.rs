//! Route definitions.

use axum::{Router, middleware, routing::get};

use crate::{auth, handlers, handlers::AppState};

/// Assemble the router: a public health probe plus the authenticated
/// `/api` surface.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/weather", get(handlers::get_weather))
        .route("/weather/history", get(handlers::get_history))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;
    use weather_core::{
        CityConfig, Reading, ReadingStore, RefreshService, SledReadingStore, UpstreamObservation,
        WeatherProvider,
    };

    /// Provider stub: every fetch fails, so handlers only ever see
    /// whatever the store was seeded with.
    #[derive(Debug)]
    struct DownProvider;

    #[async_trait]
    impl WeatherProvider for DownProvider {
        async fn fetch_current(&self, _lat: f64, _lng: f64) -> Option<UpstreamObservation> {
            None
        }
    }

    fn cities() -> Vec<CityConfig> {
        vec![CityConfig {
            name: "Tokyo".to_string(),
            lat: 35.6895,
            lng: 139.6917,
            timezone: "Asia/Tokyo".to_string(),
        }]
    }

    fn app(store: SledReadingStore, api_key: Option<&str>) -> Router {
        let store: Arc<dyn ReadingStore> = Arc::new(store);
        let cities = Arc::new(cities());
        let refresh = Arc::new(RefreshService::new(
            cities.as_ref().clone(),
            Arc::clone(&store),
            Arc::new(DownProvider),
            1,
        ));

        create_router(AppState {
            refresh,
            store,
            cities,
            api_key: api_key.map(str::to_string),
        })
    }

    fn request(uri: &str, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::empty()).expect("request")
    }

    async fn seed(store: &SledReadingStore) {
        let reading = Reading::from_celsius(
            Some(20.0),
            "Asia/Tokyo".to_string(),
            "2024-01-01T19:58:20+00:00".to_string(),
        );
        store.upsert_append("Tokyo", reading, chrono::Utc::now()).await.expect("seed");
    }

    #[tokio::test]
    async fn health_is_unauthenticated() {
        let app = app(SledReadingStore::in_memory().expect("store"), Some("secret"));
        let res = app.oneshot(request("/health", None)).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_api_key_is_unauthorized() {
        let app = app(SledReadingStore::in_memory().expect("store"), Some("secret"));
        let res = app.oneshot(request("/api/weather", None)).await.expect("response");
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_api_key_is_forbidden() {
        let app = app(SledReadingStore::in_memory().expect("store"), Some("secret"));
        let res = app.oneshot(request("/api/weather", Some("nope"))).await.expect("response");
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn auth_disabled_when_no_key_configured() {
        let store = SledReadingStore::in_memory().expect("store");
        seed(&store).await;

        let app = app(store, None);
        let res = app.oneshot(request("/api/weather", None)).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_result_set_maps_to_not_found() {
        let app = app(SledReadingStore::in_memory().expect("store"), Some("secret"));
        let res = app.oneshot(request("/api/weather", Some("secret"))).await.expect("response");

        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = res.into_body().collect().await.expect("body").to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["detail"], "No weather data available");
    }

    #[tokio::test]
    async fn seeded_store_serves_readings() {
        let store = SledReadingStore::in_memory().expect("store");
        seed(&store).await;

        let app = app(store, Some("secret"));
        let res = app.oneshot(request("/api/weather", Some("secret"))).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.expect("body").to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json[0]["city"], "Tokyo");
        assert_eq!(json[0]["readings"][0]["tempF"], 68.0);
    }

    #[tokio::test]
    async fn history_rows_have_time_of_day_and_no_timezone() {
        let store = SledReadingStore::in_memory().expect("store");
        seed(&store).await;

        let app = app(store, Some("secret"));
        let res =
            app.oneshot(request("/api/weather/history", Some("secret"))).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.expect("body").to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json[0]["city"], "Tokyo");
        assert_eq!(json[0]["localTime"], "19:58:20");
        assert!(json[0].get("timezone").is_none());
    }
}
