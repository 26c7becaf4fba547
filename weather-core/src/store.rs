use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::{CityRecord, Reading};

/// Reading store failures. Surfaced per city by the refresh engine;
/// one city's persistence trouble never aborts the others.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistence backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("Corrupt record for city '{city}': {source}")]
    Corrupt {
        city: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-city persistence with an atomic bounded-append mutation.
///
/// `upsert_append` must serialize concurrent writers for the same city so
/// the 10-entry history cap can never be violated by interleaved appends.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Point lookup by city name. No side effects.
    async fn get(&self, city: &str) -> Result<Option<CityRecord>, StoreError>;

    /// Create-or-append: records are created lazily on first successful
    /// fetch; an existing history is extended, truncated to the 10 most
    /// recent readings, and stamped with `refreshed_at`. Returns the
    /// post-merge record.
    async fn upsert_append(
        &self,
        city: &str,
        reading: Reading,
        refreshed_at: DateTime<Utc>,
    ) -> Result<CityRecord, StoreError>;
}

/// Sled-backed reading store. One key per city, record stored as JSON.
#[derive(Debug, Clone)]
pub struct SledReadingStore {
    db: sled::Db,
}

impl SledReadingStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Temporary in-memory store; nothing survives drop. Intended for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

#[async_trait]
impl ReadingStore for SledReadingStore {
    #[instrument(skip(self))]
    async fn get(&self, city: &str) -> Result<Option<CityRecord>, StoreError> {
        match self.db.get(city.as_bytes())? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|source| StoreError::Corrupt { city: city.to_string(), source })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, reading))]
    async fn upsert_append(
        &self,
        city: &str,
        reading: Reading,
        refreshed_at: DateTime<Utc>,
    ) -> Result<CityRecord, StoreError> {
        // update_and_fetch retries the closure under a compare-and-swap
        // loop, so same-city appends serialize and the history cap holds
        // under concurrency.
        let updated = self.db.update_and_fetch(city.as_bytes(), |old| {
            let mut record = old
                .and_then(|bytes| serde_json::from_slice::<CityRecord>(bytes).ok())
                .unwrap_or_else(|| CityRecord {
                    city: city.to_string(),
                    readings: Vec::new(),
                    last_refresh: None,
                });

            record.append(reading.clone(), refreshed_at);

            // A plain struct of strings and numbers always serializes; the
            // fallback keeps the previous value rather than dropping the key.
            serde_json::to_vec(&record).ok().or_else(|| old.map(<[u8]>::to_vec))
        })?;

        let bytes = updated.ok_or_else(|| StoreError::Backend(sled::Error::ReportableBug(
            "upsert_append left no record behind".to_string(),
        )))?;

        let record: CityRecord = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Corrupt { city: city.to_string(), source })?;

        debug!(city, history_len = record.readings.len(), "Upserted reading");

        Ok(record)
    }
}
