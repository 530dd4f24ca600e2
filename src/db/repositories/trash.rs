use crate::entities::{prelude::*, trash};
use crate::error::CoreResult;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

pub struct TrashRepository {
    conn: DatabaseConnection,
}

impl TrashRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, entity_type: Option<&str>) -> CoreResult<Vec<trash::Model>> {
        let mut q = Trash::find();
        if let Some(t) = entity_type {
            q = q.filter(trash::Column::EntityType.eq(t));
        }
        Ok(q.all(&self.conn).await?)
    }

    pub async fn get(&self, id: i32) -> CoreResult<Option<trash::Model>> {
        Ok(Trash::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn remove(&self, id: i32) -> CoreResult<()> {
        Trash::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}

/// Shared helper used by per-entity repositories when soft-deleting.
pub(crate) async fn insert(
    conn: &DatabaseConnection,
    entity_type: &str,
    original_id: i32,
    payload: &str,
) -> CoreResult<()> {
    let model = trash::ActiveModel {
        entity_type: Set(entity_type.to_string()),
        original_id: Set(original_id),
        payload: Set(payload.to_string()),
        deleted_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };
    Trash::insert(model).exec(conn).await?;
    Ok(())
}
