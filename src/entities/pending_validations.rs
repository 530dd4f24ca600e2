use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_validations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub video_file_id: i32,
    /// "pending" | "validated" | "rejected"
    pub status: String,
    pub auto_validated: bool,
    pub selected_candidate_id: Option<String>,
    /// JSON array of `CandidateSnapshot`, ordered by descending score.
    pub candidates: String,
    /// Identifier shared by siblings auto-validated in the same series
    /// cascade (§4.4); null for standalone items.
    pub cascade_root: Option<i32>,
    /// Series title re-derived from the parent directory, used to group
    /// cascade siblings before any candidate has a resolved series id.
    pub series_group_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
