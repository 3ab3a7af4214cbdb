use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SearchEngine;

pub mod migrator;
pub mod repositories;

pub use repositories::page::Page;
pub use repositories::user::{CreateUserError, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite:")
                .trim_start_matches("//")
                .split('?')
                .next()
                .unwrap_or_default();
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to an in-memory database would otherwise
        // see its own empty database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        // An in-memory database lives only as long as its connection, so
        // that connection is never recycled.
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn page_repo(&self) -> repositories::page::PageRepository {
        repositories::page::PageRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().get_by_reset_token(token).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i32, CreateUserError> {
        self.user_repo()
            .create(username, email, password_hash)
            .await
    }

    pub async fn update_user_password(&self, id: i32, new_hash: &str) -> Result<()> {
        self.user_repo().update_password(id, new_hash).await
    }

    pub async fn set_reset_token(
        &self,
        id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.user_repo()
            .set_reset_token(id, token, expires_at)
            .await
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        self.user_repo().clear_reset_token(id).await
    }

    pub async fn set_force_password_reset(&self, username: &str, flag: bool) -> Result<bool> {
        self.user_repo()
            .set_force_password_reset(username, flag)
            .await
    }

    pub async fn search_pages(
        &self,
        engine: SearchEngine,
        query: &str,
        language: &str,
        limit: u64,
    ) -> Result<Vec<Page>> {
        self.page_repo()
            .search(engine, query, language, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEST_DATABASE_URL;
    use sea_orm::{ConnectionTrait, DbBackend, Statement};

    /// Layout the crawler creates before this application ever starts.
    const CRAWLER_SCHEMA: &[&str] = &[
        "CREATE TABLE pages (\
         title TEXT PRIMARY KEY UNIQUE, \
         url TEXT NOT NULL UNIQUE, \
         language TEXT NOT NULL CHECK(language IN ('en', 'da')) DEFAULT 'en', \
         last_updated TIMESTAMP, \
         content TEXT NOT NULL)",
        "CREATE VIRTUAL TABLE pages_fts \
         USING fts5(title, content, content='pages', content_rowid='rowid')",
        "INSERT INTO pages (title, url, language, last_updated, content) VALUES \
         ('Rust', 'https://example.com/rust', 'en', '2024-01-01 10:00:00', 'Rust is a systems programming language'), \
         ('Python', 'https://example.com/python', 'en', NULL, 'Python is a dynamic programming language'), \
         ('Rust_da', 'https://example.com/rust_da', 'da', NULL, 'Rust er et programmeringssprog')",
        "INSERT INTO pages_fts(pages_fts) VALUES ('rebuild')",
    ];

    #[tokio::test]
    async fn test_opens_crawler_database() {
        let path = std::env::temp_dir().join(format!("dynasearch-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite:{}?mode=rwc", path.display());

        let crawler = Database::connect(&url).await.unwrap();
        for statement in CRAWLER_SCHEMA {
            crawler.execute_unprepared(statement).await.unwrap();
        }
        crawler.close().await.unwrap();

        let store = Store::new(&url).await.unwrap();

        let hits = store
            .search_pages(SearchEngine::Fulltext, "systems", "en", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust");
        assert_eq!(hits[0].last_updated.as_deref(), Some("2024-01-01 10:00:00"));

        let hits = store
            .search_pages(SearchEngine::Substring, "programm", "da", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust_da");

        // The crawler's table keeps its own shape: no triggers or indexes added.
        let row = store
            .conn
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT count(*) AS n FROM sqlite_master \
                 WHERE tbl_name = 'pages' AND type IN ('trigger', 'index') AND sql IS NOT NULL",
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.try_get::<i64>("", "n").unwrap(), 0);

        store.conn.close().await.unwrap();
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_create_user_reports_duplicates() {
        let store = Store::new(TEST_DATABASE_URL).await.unwrap();
        store
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let err = store
            .create_user("alice", "other@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, CreateUserError::UsernameTaken), "{err:?}");

        let err = store
            .create_user("bob", "alice@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, CreateUserError::EmailTaken), "{err:?}");

        assert!(store.get_user_by_username("bob").await.unwrap().is_none());
    }
}
