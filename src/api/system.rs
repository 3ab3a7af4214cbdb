use axum::Json;

use super::StatusResponse;

/// Liveness only; never touches the database.
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}
