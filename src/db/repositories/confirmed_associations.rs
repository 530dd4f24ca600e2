use crate::entities::{confirmed_associations, prelude::*};
use crate::error::CoreResult;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

pub struct ConfirmedAssociationRepository {
    conn: DatabaseConnection,
}

impl ConfirmedAssociationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn confirm(&self, entity_type: &str, entity_id: i32) -> CoreResult<()> {
        if self.is_confirmed(entity_type, entity_id).await? {
            return Ok(());
        }
        let model = confirmed_associations::ActiveModel {
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id),
            confirmed_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        ConfirmedAssociations::insert(model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn is_confirmed(&self, entity_type: &str, entity_id: i32) -> CoreResult<bool> {
        let count = ConfirmedAssociations::find()
            .filter(confirmed_associations::Column::EntityType.eq(entity_type))
            .filter(confirmed_associations::Column::EntityId.eq(entity_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }
}
