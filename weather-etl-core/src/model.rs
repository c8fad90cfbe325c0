use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Raw JSON body returned by the Open-Meteo forecast endpoint.
///
/// The payload is kept opaque; only the `current` block is ever looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawWeatherResponse(Value);

impl RawWeatherResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Only a non-empty JSON object can carry weather data. `null`, `{}`,
    /// arrays and bare scalars (`""`, `0`, `false`, ...) count as empty.
    pub fn is_empty(&self) -> bool {
        !matches!(&self.0, Value::Object(map) if !map.is_empty())
    }

    /// Numeric field from the `current` block, if present.
    pub fn current_number(&self, field: &str) -> Option<Number> {
        match self.0.get("current")?.get(field)? {
            Value::Number(n) => Some(n.clone()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawWeatherResponse {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn london() -> Self {
        Self {
            name: "London".to_string(),
            latitude: 51.5074,
            longitude: -0.1278,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::london()
    }
}

/// Current conditions, renamed from the API's `*_2m` keys.
///
/// Values are passed through as the API sent them, so an integer humidity
/// stays an integer in the written file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_celsius: Option<Number>,
    pub humidity_percent: Option<Number>,
    pub weather_code: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeatherRecord {
    /// Time of transformation (UTC, no offset).
    pub timestamp: NaiveDateTime,
    pub location: Location,
    pub weather: WeatherReading,
}
