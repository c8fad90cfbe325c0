use crate::{
    clock::Clock,
    error::{MissingDataError, StageError},
    model::{Location, NormalizedWeatherRecord, RawWeatherResponse, WeatherReading},
    stage::TaskId,
};

/// Reshape the fetched payload into a [`NormalizedWeatherRecord`].
///
/// Fails only when the fetch task handed over nothing. Absent or non-numeric
/// `current.*` fields become `null`. The timestamp is taken from `clock` at
/// transformation time.
pub fn transform(
    raw: Option<&RawWeatherResponse>,
    location: &Location,
    clock: &dyn Clock,
) -> Result<NormalizedWeatherRecord, StageError> {
    tracing::info!("Starting weather transform task");

    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        let err = MissingDataError {
            upstream: TaskId::FetchWeather,
        };
        tracing::error!(error = %err, "Cannot transform weather data");
        return Err(err.into());
    };

    let record = NormalizedWeatherRecord {
        timestamp: clock.now().naive_utc(),
        location: location.clone(),
        weather: WeatherReading {
            temperature_celsius: raw.current_number("temperature_2m"),
            humidity_percent: raw.current_number("relative_humidity_2m"),
            weather_code: raw.current_number("weather_code"),
        },
    };

    tracing::info!(?record, "Transformed weather data");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 13, 10, 0, 0).unwrap())
    }

    #[test]
    fn full_payload_is_renamed() {
        let raw = RawWeatherResponse::new(json!({
            "current": { "temperature_2m": 15.3, "relative_humidity_2m": 80, "weather_code": 3 }
        }));

        let record = transform(Some(&raw), &Location::london(), &clock()).unwrap();

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "timestamp": "2026-01-13T10:00:00",
                "location": { "name": "London", "latitude": 51.5074, "longitude": -0.1278 },
                "weather": {
                    "temperature_celsius": 15.3,
                    "humidity_percent": 80,
                    "weather_code": 3
                }
            })
        );
    }

    #[test]
    fn missing_fields_become_null() {
        let raw = RawWeatherResponse::new(json!({
            "current": { "relative_humidity_2m": 64 }
        }));

        let record = transform(Some(&raw), &Location::london(), &clock()).unwrap();

        assert_eq!(record.weather.temperature_celsius, None);
        assert_eq!(record.weather.humidity_percent, Some(64.into()));
        assert_eq!(record.weather.weather_code, None);
    }

    #[test]
    fn payload_without_current_block_still_transforms() {
        let raw = RawWeatherResponse::new(json!({ "latitude": 51.5 }));

        let record = transform(Some(&raw), &Location::london(), &clock()).unwrap();

        assert_eq!(
            record.weather,
            WeatherReading {
                temperature_celsius: None,
                humidity_percent: None,
                weather_code: None,
            }
        );
        assert_eq!(record.location, Location::london());
    }

    #[test]
    fn absent_or_empty_input_is_missing_data() {
        let inputs = [
            None,
            Some(RawWeatherResponse::new(json!({}))),
            Some(RawWeatherResponse::new(json!(""))),
            Some(RawWeatherResponse::new(json!(0))),
            Some(RawWeatherResponse::new(json!(false))),
        ];
        for raw in inputs {
            let err = transform(raw.as_ref(), &Location::london(), &clock()).unwrap_err();
            match err {
                StageError::MissingData(e) => assert_eq!(e.upstream, TaskId::FetchWeather),
                other => panic!("expected missing data, got {other:?}"),
            }
        }
    }

    #[test]
    fn same_input_and_time_gives_identical_bytes() {
        let raw = RawWeatherResponse::new(json!({
            "current": { "temperature_2m": -2.5, "relative_humidity_2m": 91, "weather_code": 71 }
        }));

        let first = transform(Some(&raw), &Location::london(), &clock()).unwrap();
        let second = transform(Some(&raw), &Location::london(), &clock()).unwrap();

        assert_eq!(
            serde_json::to_vec_pretty(&first).unwrap(),
            serde_json::to_vec_pretty(&second).unwrap()
        );
    }
}
