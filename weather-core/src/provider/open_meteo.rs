use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

use super::{UpstreamObservation, WeatherProvider};

/// Open-Meteo client for current-weather point queries.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Open-Meteo HTTP client")?;

        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), http })
    }

    async fn try_fetch(&self, lat: f64, lng: f64) -> Result<UpstreamObservation> {
        let url = format!("{}/forecast", self.base_url);

        debug!(lat, lng, "Fetching current weather from Open-Meteo");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lng.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Open-Meteo response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OmResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo JSON")?;

        let current = parsed
            .current_weather
            .ok_or_else(|| anyhow!("Open-Meteo response contained no current_weather block"))?;

        Ok(UpstreamObservation { temperature: current.temperature })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_current(&self, lat: f64, lng: f64) -> Option<UpstreamObservation> {
        match self.try_fetch(lat, lng).await {
            Ok(observation) => Some(observation),
            Err(err) => {
                warn!(lat, lng, error = %err, "Upstream weather fetch failed");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current_weather: Option<OmCurrentWeather>,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}
