use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// Raw upstream observation, before unit conversion and timestamping.
///
/// The upstream may report a current-weather block without a temperature;
/// that still counts as a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamObservation {
    pub temperature: Option<f64>,
}

/// Single-point weather query against an external provider.
///
/// Deliberately dumb: one attempt per invocation, no retry, no backoff.
/// Every failure mode (transport error, non-2xx status, unparseable or
/// empty body) is reported as `None`; policy lives in the refresh engine.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, lat: f64, lng: f64) -> Option<UpstreamObservation>;
}
