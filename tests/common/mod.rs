#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use dynasearch::api::AppState;
use dynasearch::clients::weatherbit::{ForecastSource, WeatherError};
use dynasearch::config::Config;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::ConnectionTrait;
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

/// Forecast upstream whose answer the test controls.
pub struct FakeForecast {
    pub calls: AtomicUsize,
    pub failure: Mutex<Option<WeatherError>>,
}

impl FakeForecast {
    pub fn failing_with(&self, error: WeatherError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl ForecastSource for FakeForecast {
    async fn fetch_forecast(&self) -> Result<Value, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(json!({
            "city_name": "Copenhagen",
            "data": [
                {"valid_date": "2024-05-01", "min_temp": 4.5, "max_temp": 12.1, "weather": {"description": "Light rain"}}
            ]
        }))
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.test_mode = true;
    config.security.argon2_memory_cost_kib = 8;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config
}

/// Router plus a cookie jar holding the session cookie, like a browser would.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub forecast: Arc<FakeForecast>,
    cookie: Option<String>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), None).await
    }

    pub async fn spawn_with(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Self {
        let forecast = Arc::new(FakeForecast {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        });
        let state = dynasearch::api::create_app_state_with_source(
            config,
            forecast.clone(),
            prometheus_handle,
        )
        .await
        .expect("Failed to create app state");
        let router = dynasearch::api::router(state.clone()).expect("Failed to build router");

        Self {
            router,
            state,
            forecast,
            cookie: None,
        }
    }

    pub async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let mut request = request;
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string();
            self.cookie = Some(pair);
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_json(&mut self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/api/register",
            &[
                ("username", username),
                ("email", email),
                ("password", password),
                ("password2", password),
            ],
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/api/login",
            &[("username", username), ("password", password)],
        )
        .await
    }

    pub fn forget_cookies(&mut self) {
        self.cookie = None;
    }

    pub async fn seed_page(&self, title: &str, language: &str, content: &str) {
        let sql = format!(
            "INSERT INTO pages (title, url, language, content) VALUES ('{title}', 'https://example.com/{title}', '{language}', '{content}')"
        );
        self.state
            .store()
            .conn
            .execute_unprepared(&sql)
            .await
            .unwrap();
    }

    pub async fn drop_pages(&self) {
        let conn = &self.state.store().conn;
        conn.execute_unprepared("DROP TABLE pages_fts")
            .await
            .unwrap();
        conn.execute_unprepared("DROP TABLE pages").await.unwrap();
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}
