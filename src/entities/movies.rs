use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub tmdb_id: Option<String>,
    #[sea_orm(indexed)]
    pub imdb_id: Option<String>,
    #[sea_orm(indexed)]
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    /// JSON array of genre strings (open set, not a closed taxonomy — §9).
    pub genres: String,
    pub duration_seconds: Option<f64>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub director: Option<String>,
    /// JSON array of up to 5 cast names, in catalog order.
    pub cast: String,
    pub video_codec: Option<String>,
    pub resolution_label: Option<String>,
    pub audio_channels: Option<String>,
    #[sea_orm(indexed)]
    pub watched: bool,
    pub personal_rating: Option<i32>,
    #[sea_orm(indexed)]
    pub file_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
