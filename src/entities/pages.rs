use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Crawled page. Populated outside this application, only ever read here.
///
/// The crawler keys pages by title and the `pages_fts` index joins on the
/// implicit SQLite rowid, so there is no surrogate id column.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "pages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub title: String,

    pub url: Option<String>,

    pub language: String,

    pub last_updated: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
