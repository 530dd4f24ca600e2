use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub path: String,
    pub filename: String,
    pub size_bytes: i64,
    #[sea_orm(indexed)]
    pub file_hash: Option<String>,
    /// JSON-encoded `MediaInfo`.
    pub media_info: Option<String>,
    /// JSON-encoded `ParsedFilename`.
    pub parsed: String,
    pub corrected_location: bool,
    pub discovered_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
