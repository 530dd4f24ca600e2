use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persistent tier of the Catalog Client's two-tier cache (§4.2), keyed by
/// request fingerprint `(endpoint, sorted-params)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_cache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub fingerprint: String,
    /// JSON-encoded response body.
    pub payload: String,
    pub fetched_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
