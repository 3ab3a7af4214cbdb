//! Integration tests for the search page and the JSON search API.

mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, body_text, test_config};
use dynasearch::config::SearchEngine;

async fn seeded_app(engine: SearchEngine) -> TestApp {
    let mut config = test_config();
    config.search.engine = engine;
    let app = TestApp::spawn_with(config, None).await;

    app.seed_page("Rust", "en", "Rust is a systems programming language").await;
    app.seed_page("Python", "en", "Python is a dynamic programming language").await;
    app.seed_page("Rust_da", "da", "Rust er et programmeringssprog").await;
    app
}

#[tokio::test]
async fn test_search_page_without_query() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"id="search-input""#));
    assert!(!html.contains(r#"id="results""#));
}

#[tokio::test]
async fn test_search_page_lists_matches() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let html = body_text(app.get("/?q=systems").await).await;
    assert!(html.contains("https://example.com/Rust"));
    assert!(!html.contains("https://example.com/Python"));
}

#[tokio::test]
async fn test_search_page_no_results() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let response = app.get("/?q=xyz_no_such_term&language=en").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("No results for"));
    assert!(!html.contains(r#"id="results""#));
}

#[tokio::test]
async fn test_search_page_storage_failure_degrades() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;
    app.drop_pages().await;

    let response = app.get("/?q=rust").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("An error occurred during the search. Please try again later.")
    );
}

#[tokio::test]
async fn test_api_search_filters_by_language() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let body = body_json(app.get_json("/api/search?q=rust&language=en").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["query"], "rust");
    assert_eq!(body["language"], "en");
    assert_eq!(body["results"][0]["title"], "Rust");

    let body = body_json(app.get_json("/api/search?q=rust&language=da").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Rust_da");
}

#[tokio::test]
async fn test_api_search_defaults() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let response = app.get_json("/api/search").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert!(body["query"].is_null());
    assert_eq!(body["language"], "en");
    assert_eq!(body["results"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_search_handles_fts_syntax() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let response = app
        .get_json("/api/search?q=%22programming%20AND%20(&language=en")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_search_storage_failure() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;
    app.drop_pages().await;

    let response = app.get_json("/api/search?q=rust").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Database error occurred during search.");
}

#[tokio::test]
async fn test_substring_engine() {
    let mut app = seeded_app(SearchEngine::Substring).await;

    let body = body_json(app.get_json("/api/search?q=gramm&language=en").await).await;
    assert_eq!(body["count"], 2);

    // LIKE wildcards are matched literally.
    let body = body_json(app.get_json("/api/search?q=%25&language=en").await).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_api_search_blank_query_skips_storage() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;
    app.drop_pages().await;

    let response = app.get_json("/api/search?q=%20%20").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["query"], "");
}

#[tokio::test]
async fn test_api_search_echoes_trimmed_query() {
    let mut app = seeded_app(SearchEngine::Fulltext).await;

    let body = body_json(app.get_json("/api/search?q=%20rust%20&language=en").await).await;
    assert_eq!(body["query"], "rust");
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_api_search_best_match_first() {
    let mut config = test_config();
    config.search.engine = SearchEngine::Fulltext;
    let mut app = TestApp::spawn_with(config, None).await;

    let filler = "the quick brown fox jumps over the lazy dog ".repeat(20);
    app.seed_page("Passing", "en", &format!("{filler} compilers {filler}")).await;
    app.seed_page("Focused", "en", "compilers compilers compilers").await;

    let body = body_json(app.get_json("/api/search?q=compilers&language=en").await).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["title"], "Focused");
    assert_eq!(body["results"][1]["title"], "Passing");
}
