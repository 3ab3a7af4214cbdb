use axum::{
    Json,
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::fmt;

use super::{StatusResponse, views};

/// Marks a response whose body must be replaced by the generic 500 page.
#[derive(Debug, Clone, Copy)]
pub struct UnhandledError;

#[derive(Debug)]
pub enum ApiError {
    /// Storage failure with a message that is safe to show.
    DatabaseError(String),

    ServiceUnavailable(String),

    /// Anything unexpected. Logged; the client only sees a generic 500.
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response.extensions_mut().insert(UnhandledError);
                return response;
            }
        };

        (status, Json(StatusResponse::error(message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::InternalError(format!("Session error: {err}"))
    }
}

pub(crate) fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Router fallback.
pub async fn not_found(headers: HeaderMap) -> Response {
    if wants_json(&headers) {
        (
            StatusCode::NOT_FOUND,
            Json(StatusResponse::error("Resource not found.")),
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, views::not_found()).into_response()
    }
}

/// Turns a handler panic into a marked 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Unhandled application error: handler panicked: {detail}");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(UnhandledError);
    response
}

/// Renders marked failures as JSON or HTML depending on what the client accepts.
pub async fn render_unhandled(req: Request, next: Next) -> Response {
    let json = wants_json(req.headers());
    let response = next.run(req).await;

    if response.extensions().get::<UnhandledError>().is_none() {
        return response;
    }

    if json {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse::error("Internal server error.")),
        )
            .into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, views::server_error()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::HeaderValue, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn boom() -> &'static str {
        panic!("secret table users leaked")
    }

    fn panicking_app() -> Router {
        Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(axum::middleware::from_fn(render_unhandled))
    }

    async fn call(accept: &str) -> (StatusCode, String) {
        let request = axum::http::Request::builder()
            .uri("/boom")
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap();
        let response = panicking_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,*/*;q=0.8"));
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_internal_error_is_marked() {
        let response = ApiError::InternalError("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<UnhandledError>().is_some());

        let response = ApiError::ServiceUnavailable("down".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.extensions().get::<UnhandledError>().is_none());
    }

    #[tokio::test]
    async fn test_panic_renders_generic_json() {
        let (status, body) = call("application/json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "message": "Internal server error."})
        );
    }

    #[tokio::test]
    async fn test_panic_renders_generic_html() {
        let (status, body) = call("text/html").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Internal Server Error"));
        assert!(!body.contains("secret"));
        assert!(!body.contains("panicked"));
    }
}
