use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use super::context::RequestContext;
use super::flash::Flash;
use super::views::{self, Layout};

pub const SEARCH_FAILED: &str = "An error occurred during the search. Please try again later.";

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub language: Option<String>,
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.unwrap_or_default();
    let language = params
        .language
        .unwrap_or_else(|| state.config().search.default_language.clone());

    let mut now = Vec::new();
    let results = match state.search_service().search(&query, &language).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(query = %query, "Search page failed: {e}");
            now.push(Flash::error(SEARCH_FAILED));
            Vec::new()
        }
    };

    let flashes = ctx.flashes(now).await;
    let layout = Layout {
        title: "Search",
        user: ctx.current_user().await,
        flashes: &flashes,
    };
    views::search(&layout, &query, &language, &results).into_response()
}

pub async fn about(ctx: RequestContext) -> Response {
    let flashes = ctx.flashes([]).await;
    views::about(&Layout {
        title: "About",
        user: ctx.current_user().await,
        flashes: &flashes,
    })
    .into_response()
}

pub async fn weather(State(state): State<Arc<AppState>>, ctx: RequestContext) -> Response {
    let mut now = Vec::new();
    let forecast = match state.weather_service().get_forecast().await {
        Ok(forecast) => Some(forecast),
        Err(e) => {
            now.push(Flash::error(e.to_string()));
            None
        }
    };

    let flashes = ctx.flashes(now).await;
    let layout = Layout {
        title: "Weather",
        user: ctx.current_user().await,
        flashes: &flashes,
    };
    views::weather(&layout, forecast.as_deref()).into_response()
}

pub async fn register(ctx: RequestContext) -> Response {
    if ctx.current_user().await.is_some() {
        return Redirect::to("/").into_response();
    }

    let flashes = ctx.flashes([]).await;
    views::register(
        &Layout {
            title: "Register",
            user: None,
            flashes: &flashes,
        },
        "",
        "",
    )
    .into_response()
}

pub async fn login(ctx: RequestContext) -> Response {
    if ctx.current_user().await.is_some() {
        return Redirect::to("/").into_response();
    }

    let flashes = ctx.flashes([]).await;
    views::login(
        &Layout {
            title: "Log in",
            user: None,
            flashes: &flashes,
        },
        "",
    )
    .into_response()
}
