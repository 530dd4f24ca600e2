use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `Episode *→1 Series`. The relation is application-owned, not a DB-level
/// cascade: trashing a Series soft-deletes its Episodes one at a time
/// (`db::repositories::episodes::trash_by_series`) so each gets its own
/// `Trash` snapshot and can be restored independently.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub series_id: i32,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    #[sea_orm(indexed)]
    pub file_path: Option<String>,
    pub video_codec: Option<String>,
    pub resolution_label: Option<String>,
    pub audio_channels: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::series::Entity",
        from = "Column::SeriesId",
        to = "super::series::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Series,
}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Series.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
