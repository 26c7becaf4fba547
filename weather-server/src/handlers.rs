//! Request handlers and shared application state.

use axum::{Json, extract::State};
use std::sync::Arc;
use weather_core::{
    CityConfig, CityReadings, HistoryRow, ReadingStore, RefreshService, build_history,
};

use crate::error::ApiError;

/// State shared across handlers: the refresh engine plus direct access
/// to the store and city table for the history view.
#[derive(Clone)]
pub struct AppState {
    pub refresh: Arc<RefreshService>,
    pub store: Arc<dyn ReadingStore>,
    pub cities: Arc<Vec<CityConfig>>,
    /// Expected `X-API-Key` value; `None` disables authentication.
    pub api_key: Option<String>,
}

/// Liveness probe, outside the authenticated surface.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run one refresh pass and return the per-city readings.
///
/// Partial data is preferred over failure: cities with stale-served or
/// empty histories still appear. Only a fully empty result set becomes
/// a not-found outcome.
pub async fn get_weather(
    State(state): State<AppState>,
) -> Result<Json<Vec<CityReadings>>, ApiError> {
    let results = state.refresh.refresh_all().await;

    if results.iter().all(|city| city.readings.is_empty()) {
        return Err(ApiError::NotFound("No weather data available".to_string()));
    }

    Ok(Json(results))
}

/// Materialize the flattened per-city history.
pub async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<HistoryRow>>, ApiError> {
    let rows = build_history(state.store.as_ref(), &state.cities)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(rows))
}
