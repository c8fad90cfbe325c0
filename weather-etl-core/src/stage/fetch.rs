use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::{config::ApiConfig, error::FetchError, model::{Location, RawWeatherResponse}};

/// Anything that can produce the raw current-weather payload for a run.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current(&self) -> Result<RawWeatherResponse, FetchError>;
}

/// Open-Meteo forecast endpoint, queried for current conditions only.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: Client,
    url: String,
    timeout: Duration,
    latitude: String,
    longitude: String,
    current: String,
    timezone: String,
}

impl OpenMeteoSource {
    pub fn new(api: &ApiConfig, location: &Location) -> Result<Self, FetchError> {
        let timeout = api.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Request {
                url: api.base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            url: api.base_url.clone(),
            timeout,
            latitude: location.latitude.to_string(),
            longitude: location.longitude.to_string(),
            current: api.current_fields.join(","),
            timezone: api.timezone.clone(),
        })
    }

    fn request_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: self.url.clone(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Request {
                url: self.url.clone(),
                source,
            }
        }
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    async fn fetch_current(&self) -> Result<RawWeatherResponse, FetchError> {
        tracing::info!(url = %self.url, "Starting weather fetch task");

        let result = async {
            let res = self
                .http
                .get(&self.url)
                .query(&[
                    ("latitude", self.latitude.as_str()),
                    ("longitude", self.longitude.as_str()),
                    ("current", self.current.as_str()),
                    ("timezone", self.timezone.as_str()),
                ])
                .send()
                .await
                .map_err(|e| self.request_error(e))?;

            let status = res.status();
            let body = res.text().await.map_err(|e| self.request_error(e))?;

            if !status.is_success() {
                return Err(FetchError::Status {
                    status,
                    body: truncate_body(&body),
                });
            }

            serde_json::from_str(&body)
                .map(RawWeatherResponse::new)
                .map_err(FetchError::Decode)
        }
        .await;

        match &result {
            Ok(raw) => tracing::info!(payload = %raw.as_json(), "Successfully fetched weather data"),
            Err(err) => tracing::error!(error = %err, "Error fetching weather data"),
        }

        result
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
