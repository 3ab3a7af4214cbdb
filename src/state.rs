use std::sync::Arc;

use crate::clients::weatherbit::{ForecastSource, WeatherbitClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService, SearchService, WeatherService};

/// Build a shared HTTP client with reasonable defaults for upstream calls.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("DynaSearch/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Long-lived services, created once at startup and shared by every request.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub search_service: Arc<SearchService>,

    pub weather_service: Arc<WeatherService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.weather.timeout_seconds)?;
        let source = Arc::new(WeatherbitClient::with_shared_client(
            http_client,
            &config.weather,
        ));
        Self::with_forecast_source(config, source).await
    }

    /// Same as [`SharedState::new`] but with a caller-supplied forecast upstream.
    pub async fn with_forecast_source(
        config: Config,
        source: Arc<dyn ForecastSource>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            config.database_url(),
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let search_service = Arc::new(SearchService::new(store.clone(), &config.search));

        let weather_service = Arc::new(WeatherService::new(
            source,
            chrono::Duration::seconds(config.weather.cache_ttl_seconds),
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            search_service,
            weather_service,
        })
    }
}
