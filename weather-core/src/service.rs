use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{
    config::CityConfig,
    model::{CityReadings, MAX_HISTORY, Reading},
    provider::WeatherProvider,
    store::ReadingStore,
};

/// Cache-refresh decision engine.
///
/// One `refresh_all` call makes a single pass over the configured cities,
/// serving cached readings while they are fresh and fetching, converting,
/// and merging a new reading when they are not. Staleness is evaluated
/// independently per city so one city's outage cannot block another's.
pub struct RefreshService {
    cities: Vec<CityConfig>,
    store: Arc<dyn ReadingStore>,
    provider: Arc<dyn WeatherProvider>,
    refresh_interval: Duration,
}

impl RefreshService {
    pub fn new(
        cities: Vec<CityConfig>,
        store: Arc<dyn ReadingStore>,
        provider: Arc<dyn WeatherProvider>,
        refresh_interval_minutes: i64,
    ) -> Self {
        Self {
            cities,
            store,
            provider,
            refresh_interval: Duration::minutes(refresh_interval_minutes.max(0)),
        }
    }

    /// Run one refresh pass against the wall clock.
    pub async fn refresh_all(&self) -> Vec<CityReadings> {
        self.refresh_at(Utc::now()).await
    }

    /// Run one refresh pass at an explicit instant. Cities are processed
    /// in configured order; a city whose record cannot be loaded is
    /// omitted from this cycle.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Vec<CityReadings> {
        let mut results = Vec::with_capacity(self.cities.len());

        for city in &self.cities {
            if let Some(readings) = self.refresh_city(city, now).await {
                results.push(readings);
            }
        }

        results
    }

    async fn refresh_city(&self, city: &CityConfig, now: DateTime<Utc>) -> Option<CityReadings> {
        let record = match self.store.get(&city.name).await {
            Ok(record) => record,
            Err(err) => {
                warn!(city = %city.name, error = %err, "Skipping city: record lookup failed");
                return None;
            }
        };

        let (mut readings, last_refresh) =
            record.map_or((Vec::new(), None), |r| (r.readings, r.last_refresh));

        let needs_update =
            last_refresh.is_none_or(|refreshed| now - refreshed >= self.refresh_interval);

        if !needs_update {
            debug!(city = %city.name, "Serving cached readings");
            return Some(CityReadings { city: city.name.clone(), readings });
        }

        let Some(observation) = self.provider.fetch_current(city.lat, city.lng).await else {
            // Fail open: last-known-good (possibly empty), no mutation.
            warn!(city = %city.name, "Upstream fetch failed, serving cached readings");
            return Some(CityReadings { city: city.name.clone(), readings });
        };

        let reading = Reading::from_celsius(
            observation.temperature,
            city.timezone.clone(),
            now.with_timezone(&Local).to_rfc3339(),
        );

        match self.store.upsert_append(&city.name, reading.clone(), now).await {
            Ok(record) => Some(CityReadings { city: city.name.clone(), readings: record.readings }),
            Err(err) => {
                // The fetch succeeded, so the reading is still authoritative
                // for this response even though it could not be persisted.
                error!(city = %city.name, error = %err, "Failed to persist reading");
                readings.push(reading);
                if readings.len() > MAX_HISTORY {
                    let excess = readings.len() - MAX_HISTORY;
                    readings.drain(..excess);
                }
                Some(CityReadings { city: city.name.clone(), readings })
            }
        }
    }
}
