use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

const FTS_TABLE: &str = "pages_fts";

/// External-content FTS5 index over `pages`, kept in sync by triggers.
/// Keyed on the implicit rowid, which every crawler-built `pages` has.
const FTS_STATEMENTS: &[&str] = &[
    "CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts \
     USING fts5(title, content, content='pages', content_rowid='rowid')",
    "CREATE TRIGGER IF NOT EXISTS pages_ai AFTER INSERT ON pages BEGIN \
     INSERT INTO pages_fts(rowid, title, content) VALUES (new.rowid, new.title, new.content); \
     END",
    "CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN \
     INSERT INTO pages_fts(pages_fts, rowid, title, content) \
     VALUES ('delete', old.rowid, old.title, old.content); \
     END",
    "CREATE TRIGGER IF NOT EXISTS pages_au AFTER UPDATE ON pages BEGIN \
     INSERT INTO pages_fts(pages_fts, rowid, title, content) \
     VALUES ('delete', old.rowid, old.title, old.content); \
     INSERT INTO pages_fts(rowid, title, content) VALUES (new.rowid, new.title, new.content); \
     END",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // A crawler-owned table, and whatever index it maintains, is left alone.
        if manager.has_table("pages").await? {
            return Ok(());
        }

        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(schema.create_table_from_entity(Pages).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pages_language")
                    .table(Pages)
                    .col(crate::entities::pages::Column::Language)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let index_existed = manager.has_table(FTS_TABLE).await?;

        let conn = manager.get_connection();
        for statement in FTS_STATEMENTS {
            conn.execute_unprepared(statement).await?;
        }

        if !index_existed {
            conn.execute_unprepared("INSERT INTO pages_fts(pages_fts) VALUES ('rebuild')")
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        for trigger in ["pages_ai", "pages_ad", "pages_au"] {
            conn.execute_unprepared(&format!("DROP TRIGGER IF EXISTS {trigger}"))
                .await?;
        }
        conn.execute_unprepared("DROP TABLE IF EXISTS pages_fts")
            .await?;

        manager
            .drop_table(Table::drop().table(Pages).to_owned())
            .await
    }
}
