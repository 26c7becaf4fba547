//! Core library for the city weather cache service.
//!
//! This crate defines:
//! - Configuration (static city table, refresh policy, upstream settings)
//! - Abstraction over the upstream weather provider
//! - The persisted per-city reading store with its bounded history
//! - The refresh engine and the history reporter
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod history;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;

pub use config::{CityConfig, Config, Environment};
pub use history::build_history;
pub use model::{CityReadings, CityRecord, HistoryRow, MAX_HISTORY, Reading};
pub use provider::{UpstreamObservation, WeatherProvider, open_meteo::OpenMeteoProvider};
pub use service::RefreshService;
pub use store::{ReadingStore, SledReadingStore, StoreError};
