use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::clients::weatherbit::ForecastSource;
use crate::config::Config;
use crate::state::SharedState;

mod assets;
pub mod auth;
pub mod context;
mod error;
pub mod flash;
mod observability;
mod pages;
mod search;
mod system;
mod types;
pub mod views;
mod weather;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn crate::services::AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn search_service(&self) -> &Arc<crate::services::SearchService> {
        &self.shared.search_service
    }

    #[must_use]
    pub fn weather_service(&self) -> &Arc<crate::services::WeatherService> {
        &self.shared.weather_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Like [`create_app_state_from_config`] with a caller-supplied forecast upstream.
pub async fn create_app_state_with_source(
    config: Config,
    source: Arc<dyn ForecastSource>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_forecast_source(config, source).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Signing key for session cookies. A configured secret keeps sessions valid
/// across restarts; without one every start invalidates existing cookies.
fn session_key(config: &Config) -> anyhow::Result<Key> {
    match &config.server.session_secret {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid session secret: {e}")),
        None => {
            tracing::warn!("No session secret configured; generated a random signing key");
            Ok(Key::generate())
        }
    }
}

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let config = state.config();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_inactivity_minutes,
        )))
        .with_signed(session_key(config)?);

    Ok(Router::new()
        .route("/", get(pages::index))
        .route("/about", get(pages::about))
        .route("/weather", get(pages::weather))
        .route("/register", get(pages::register))
        .route("/login", get(pages::login))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", get(auth::logout))
        .route(
            "/reset_password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route(
            "/api/request_reset_password",
            post(auth::request_reset_password),
        )
        .route("/api/search", get(search::search_pages))
        .route("/api/weather", get(weather::get_forecast))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/static/{*path}", get(assets::serve_asset))
        .fallback(error::not_found)
        .layer(middleware::from_fn(auth::force_reset_guard))
        .layer(session_layer)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(middleware::from_fn(error::render_unhandled))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(middleware::from_fn(observability::track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
