use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Weak reference (no FK) to a Movie/Episode the operator has blessed as
/// correct, excluding it from future association-checker scans even if
/// re-associated later.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "confirmed_associations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub entity_type: String,
    #[sea_orm(indexed)]
    pub entity_id: i32,
    pub confirmed_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
