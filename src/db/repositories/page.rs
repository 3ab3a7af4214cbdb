use anyhow::{Context, Result};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, QuerySelect, Statement,
};

use crate::config::SearchEngine;
use crate::entities::pages;

pub type Page = pages::Model;

const FULLTEXT_SQL: &str = "SELECT p.title, p.url, p.language, p.last_updated, p.content \
     FROM pages p \
     JOIN pages_fts f ON p.rowid = f.rowid \
     WHERE f.pages_fts MATCH ? AND p.language = ? \
     ORDER BY f.rank \
     LIMIT ?";

pub struct PageRepository {
    conn: DatabaseConnection,
}

impl PageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Run a non-empty query with the given engine.
    pub async fn search(
        &self,
        engine: SearchEngine,
        query: &str,
        language: &str,
        limit: u64,
    ) -> Result<Vec<Page>> {
        match engine {
            SearchEngine::Fulltext => self.search_fulltext(query, language, limit).await,
            SearchEngine::Substring => self.search_substring(query, language, limit).await,
        }
    }

    /// FTS5 match, best bm25 rank first.
    async fn search_fulltext(&self, query: &str, language: &str, limit: u64) -> Result<Vec<Page>> {
        let Some(expression) = fts_match_expression(query) else {
            return Ok(Vec::new());
        };

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let statement = Statement::from_sql_and_values(
            DbBackend::Sqlite,
            FULLTEXT_SQL,
            [expression.into(), language.into(), limit.into()],
        );

        pages::Entity::find()
            .from_raw_sql(statement)
            .all(&self.conn)
            .await
            .context("Full-text page search failed")
    }

    /// Case-insensitive containment over page content, storage order.
    async fn search_substring(
        &self,
        query: &str,
        language: &str,
        limit: u64,
    ) -> Result<Vec<Page>> {
        let pattern = format!("%{}%", escape_like(query));

        pages::Entity::find()
            .filter(pages::Column::Content.like(LikeExpr::new(pattern).escape('\\')))
            .filter(pages::Column::Language.eq(language))
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Substring page search failed")
    }
}

/// Turn free text into an FTS5 expression that cannot be a syntax error:
/// every whitespace-separated token becomes a quoted string, and the
/// strings are implicitly AND-ed.
#[must_use]
pub fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_match_expression() {
        assert_eq!(fts_match_expression("rust"), Some("\"rust\"".to_string()));
        assert_eq!(
            fts_match_expression("  hello   world "),
            Some("\"hello\" \"world\"".to_string())
        );
        assert_eq!(
            fts_match_expression("say \"hi\" OR"),
            Some("\"say\" \"\"\"hi\"\"\" \"OR\"".to_string())
        );
        assert_eq!(fts_match_expression("   "), None);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
