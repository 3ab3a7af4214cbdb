use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clients::weatherbit::{ForecastSource, WeatherError};

/// Last good forecast and when it stops being served.
#[derive(Debug)]
struct ForecastCache {
    data: Option<Arc<Value>>,
    expires_at: DateTime<Utc>,
}

/// Forecast lookup behind a TTL cache.
///
/// The lock is held across the upstream fetch, so concurrent misses wait
/// for the first fetch instead of each calling upstream. The wait is
/// bounded by the HTTP client timeout.
pub struct WeatherService {
    source: Arc<dyn ForecastSource>,
    ttl: Duration,
    cache: Mutex<ForecastCache>,
}

impl WeatherService {
    #[must_use]
    pub fn new(source: Arc<dyn ForecastSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(ForecastCache {
                data: None,
                expires_at: DateTime::<Utc>::MIN_UTC,
            }),
        }
    }

    pub async fn get_forecast(&self) -> Result<Arc<Value>, WeatherError> {
        self.get_forecast_at(Utc::now()).await
    }

    /// Cache policy with an explicit clock.
    pub async fn get_forecast_at(&self, now: DateTime<Utc>) -> Result<Arc<Value>, WeatherError> {
        let mut cache = self.cache.lock().await;

        if let Some(data) = &cache.data
            && now < cache.expires_at
        {
            debug!("Weather forecast cache hit");
            metrics::counter!("weather_cache_hits_total").increment(1);
            return Ok(Arc::clone(data));
        }

        info!("Weather forecast cache miss or expired. Fetching new data.");
        metrics::counter!("weather_cache_misses_total").increment(1);

        match self.source.fetch_forecast().await {
            Ok(forecast) => {
                let forecast = Arc::new(forecast);
                cache.data = Some(Arc::clone(&forecast));
                cache.expires_at = now + self.ttl;
                info!("Weather forecast cache updated");
                Ok(forecast)
            }
            Err(e) => {
                // Leave the cache alone so the next read retries.
                warn!("Failed to fetch new forecast data: {e}");
                metrics::counter!("weather_fetch_errors_total", "kind" => e.kind()).increment(1);
                Err(e)
            }
        }
    }
}
