use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::pages::SearchParams;
use super::{ApiError, AppState, SearchResponse};

/// `GET /api/search?q=&language=`
pub async fn search_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let language = params
        .language
        .unwrap_or_else(|| state.config().search.default_language.clone());
    let query = params.q.as_deref().map(str::trim);

    let results = state
        .search_service()
        .search(query.unwrap_or_default(), &language)
        .await
        .map_err(|e| {
            tracing::error!(query = query.unwrap_or_default(), "Search API failed: {e}");
            ApiError::DatabaseError("Database error occurred during search.".to_string())
        })?;

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
        query: query.map(str::to_string),
        language,
    }))
}
