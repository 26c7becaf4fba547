use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One weather observation for a city.
///
/// Temperatures are nullable because the upstream API may omit them;
/// Fahrenheit is always derived from Celsius, never stored independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "tempC")]
    pub temp_c: Option<f64>,
    #[serde(rename = "tempF")]
    pub temp_f: Option<f64>,
    pub timezone: String,
    #[serde(rename = "localTime")]
    pub local_time: String,
}

impl Reading {
    /// Build a reading from an upstream Celsius value, deriving Fahrenheit.
    pub fn from_celsius(temp_c: Option<f64>, timezone: String, local_time: String) -> Self {
        Self {
            temp_c,
            temp_f: temp_c.map(celsius_to_fahrenheit),
            timezone,
            local_time,
        }
    }
}

/// Celsius to Fahrenheit, rounded to 2 decimal places.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    ((c * 9.0 / 5.0 + 32.0) * 100.0).round() / 100.0
}

/// Maximum number of readings retained per city; oldest evicted first.
pub const MAX_HISTORY: usize = 10;

/// Persisted per-city state: bounded reading history plus the timestamp
/// of the last successful upstream fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub city: String,
    pub readings: Vec<Reading>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl CityRecord {
    /// Append a reading, evicting the oldest beyond [`MAX_HISTORY`],
    /// and advance the refresh timestamp.
    pub fn append(&mut self, reading: Reading, refreshed_at: DateTime<Utc>) {
        self.readings.push(reading);
        if self.readings.len() > MAX_HISTORY {
            let excess = self.readings.len() - MAX_HISTORY;
            self.readings.drain(..excess);
        }
        self.last_refresh = Some(refreshed_at);
    }
}

/// Per-city slice of a refresh response: name plus the last 10 readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityReadings {
    pub city: String,
    pub readings: Vec<Reading>,
}

/// Flattened history row. Carries no timezone; `local_time` is the
/// time-of-day (`HH:MM:SS`) extracted from the stored timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub city: String,
    #[serde(rename = "tempC")]
    pub temp_c: Option<f64>,
    #[serde(rename = "tempF")]
    pub temp_f: Option<f64>,
    #[serde(rename = "localTime")]
    pub local_time: String,
}
