use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    config::CityConfig,
    model::HistoryRow,
    store::{ReadingStore, StoreError},
};

/// Flatten the accumulated per-city histories into normalized rows.
///
/// Read-only: every city with a non-empty history contributes one row per
/// stored reading, grouped per city in configured city order. The stored
/// timestamp is reduced to its time of day and the timezone label is
/// dropped from the row.
pub async fn build_history(
    store: &dyn ReadingStore,
    cities: &[CityConfig],
) -> Result<Vec<HistoryRow>, StoreError> {
    let mut rows = Vec::new();

    for city in cities {
        let Some(record) = store.get(&city.name).await? else {
            continue;
        };

        for reading in record.readings {
            rows.push(HistoryRow {
                city: record.city.clone(),
                temp_c: reading.temp_c,
                temp_f: reading.temp_f,
                local_time: time_of_day(&reading.local_time),
            });
        }
    }

    Ok(rows)
}

/// Reduce a stored ISO-8601 timestamp to `HH:MM:SS`.
///
/// Offset-qualified timestamps are normalized to UTC first; bare ones are
/// taken as UTC. Unparseable values pass through unchanged.
fn time_of_day(local_time: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(local_time) {
        return dt.with_timezone(&Utc).format("%H:%M:%S").to_string();
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(local_time, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%H:%M:%S").to_string();
    }

    local_time.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::CityConfig,
        model::Reading,
        store::SledReadingStore,
    };
    use chrono::Utc;

    fn city(name: &str) -> CityConfig {
        CityConfig { name: name.to_string(), lat: 0.0, lng: 0.0, timezone: "UTC".to_string() }
    }

    #[test]
    fn offset_qualified_timestamp_becomes_time_of_day() {
        assert_eq!(time_of_day("2024-01-01T19:58:20+00:00"), "19:58:20");
    }

    #[test]
    fn nonzero_offset_is_normalized_to_utc() {
        assert_eq!(time_of_day("2024-01-01T19:58:20+02:00"), "17:58:20");
    }

    #[test]
    fn bare_timestamp_is_taken_as_utc() {
        assert_eq!(time_of_day("2024-01-01T19:58:20.123456"), "19:58:20");
    }

    #[test]
    fn unparseable_timestamp_passes_through() {
        assert_eq!(time_of_day("not-a-time"), "not-a-time");
    }

    #[tokio::test]
    async fn rows_are_flattened_per_city_without_timezone() {
        let store = SledReadingStore::in_memory().expect("store");
        let reading = Reading::from_celsius(
            Some(20.0),
            "Europe/London".to_string(),
            "2024-01-01T19:58:20+00:00".to_string(),
        );
        store.upsert_append("London", reading, Utc::now()).await.expect("seed");

        let rows = build_history(&store, &[city("Tokyo"), city("London")])
            .await
            .expect("history");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "London");
        assert_eq!(rows[0].temp_c, Some(20.0));
        assert_eq!(rows[0].temp_f, Some(68.0));
        assert_eq!(rows[0].local_time, "19:58:20");

        let json = serde_json::to_value(&rows[0]).expect("serialize");
        assert!(json.get("timezone").is_none());
        assert_eq!(json["localTime"], "19:58:20");
    }

    #[tokio::test]
    async fn cities_without_history_contribute_no_rows() {
        let store = SledReadingStore::in_memory().expect("store");
        let rows = build_history(&store, &[city("Tokyo")]).await.expect("history");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn rows_follow_configured_city_order() {
        let store = SledReadingStore::in_memory().expect("store");
        let now = Utc::now();

        for name in ["Sydney", "Tokyo"] {
            let reading = Reading::from_celsius(
                Some(10.0),
                "UTC".to_string(),
                "2024-01-01T00:00:00+00:00".to_string(),
            );
            store.upsert_append(name, reading, now).await.expect("seed");
        }

        let rows = build_history(&store, &[city("Tokyo"), city("Sydney")])
            .await
            .expect("history");

        let order: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(order, vec!["Tokyo", "Sydney"]);
    }
}
