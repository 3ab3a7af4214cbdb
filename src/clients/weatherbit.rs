use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use crate::config::WeatherConfig;

/// Why a forecast could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Weather service is not configured.")]
    Config,

    #[error("Failed to retrieve weather data. API responded with status: {status}")]
    Api { status: u16 },

    #[error("Failed to connect to weather service: {0}")]
    Connection(String),
}

impl WeatherError {
    /// Stable label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config => "config_error",
            Self::Api { .. } => "api_error",
            Self::Connection(_) => "connection_error",
        }
    }
}

/// Upstream producer of forecast payloads.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_forecast(&self) -> Result<Value, WeatherError>;
}

/// Weatherbit daily forecast API.
#[derive(Clone)]
pub struct WeatherbitClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    city: String,
    days: u32,
}

impl WeatherbitClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            city: config.city.clone(),
            days: config.days,
        }
    }
}

#[async_trait]
impl ForecastSource for WeatherbitClient {
    async fn fetch_forecast(&self) -> Result<Value, WeatherError> {
        let Some(api_key) = &self.api_key else {
            error!("Weather API key is not set. Cannot fetch forecast.");
            return Err(WeatherError::Config);
        };

        let url = format!("{}/forecast/daily", self.base_url);
        let days = self.days.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("city", self.city.as_str()),
                ("key", api_key.as_str()),
                ("days", days.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching forecast from {url}: {e}");
                WeatherError::Connection(e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Failed to retrieve weather data. API response code: {}, Body: {}",
                status, body
            );
            return Err(WeatherError::Api {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            error!("Weather API returned an unreadable body: {e}");
            WeatherError::Connection(e.without_url().to_string())
        })
    }
}
