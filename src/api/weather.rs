use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};

/// `GET /api/weather`: the cached forecast, or 503 when it cannot be fetched.
pub async fn get_forecast(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let forecast = state
        .weather_service()
        .get_forecast()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    Ok(Json(&*forecast).into_response())
}
