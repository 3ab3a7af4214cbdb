use thiserror::Error;
use tracing::{debug, error};

use crate::config::{SearchConfig, SearchEngine};
use crate::db::{Page, Store};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Database error: {0}")]
    Storage(String),
}

/// Page search over the crawled corpus.
pub struct SearchService {
    store: Store,
    engine: SearchEngine,
    max_results: u64,
}

impl SearchService {
    #[must_use]
    pub fn new(store: Store, config: &SearchConfig) -> Self {
        Self {
            store,
            engine: config.engine,
            max_results: config.max_results,
        }
    }

    #[must_use]
    pub const fn engine(&self) -> SearchEngine {
        self.engine
    }

    /// Search pages in `language`. A blank query returns nothing without
    /// touching the database.
    pub async fn search(&self, query: &str, language: &str) -> Result<Vec<Page>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .store
            .search_pages(self.engine, query, language, self.max_results)
            .await
            .map_err(|e| {
                error!("Database error during search for '{query}' (lang: {language}): {e:#}");
                metrics::counter!("search_errors_total").increment(1);
                SearchError::Storage(format!("{e:#}"))
            })?;

        debug!(
            engine = ?self.engine,
            count = results.len(),
            "Search for '{query}' (lang: {language})"
        );
        metrics::counter!("search_queries_total").increment(1);

        Ok(results)
    }
}
