use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "series")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub tmdb_id: Option<String>,
    #[sea_orm(indexed)]
    pub tvdb_id: Option<String>,
    #[sea_orm(indexed)]
    pub imdb_id: Option<String>,
    #[sea_orm(indexed)]
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub genres: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub created_by: Option<String>,
    pub cast: String,
    #[sea_orm(indexed)]
    pub watched: bool,
    pub personal_rating: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::episodes::Entity")]
    Episodes,
}

impl Related<super::episodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
