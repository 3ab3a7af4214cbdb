use serde::Serialize;

use crate::db::Page;

/// `{"status": "...", "message": "..."}` body used by health and error responses.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Page>,
    pub count: usize,
    pub query: Option<String>,
    pub language: String,
}
