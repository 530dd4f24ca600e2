use crate::entities::{episodes, prelude::*};
use crate::error::{CoreError, CoreResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TryIntoModel,
};

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> CoreResult<Option<episodes::Model>> {
        Ok(Episodes::find_by_id(id).one(&self.conn).await?)
    }

    /// Enforces invariant 2 (`(series_id, season_number, episode_number)`
    /// unique) before the insert hits the DB's unique index, so callers get
    /// a typed `Conflict`-free `NotFound`-free error path to branch on.
    pub async fn get_by_natural_key(
        &self,
        series_id: i32,
        season_number: i32,
        episode_number: i32,
    ) -> CoreResult<Option<episodes::Model>> {
        Ok(Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(&self.conn)
            .await?)
    }

    pub async fn list_by_series(&self, series_id: i32) -> CoreResult<Vec<episodes::Model>> {
        Ok(Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .all(&self.conn)
            .await?)
    }

    pub async fn save(&self, model: episodes::ActiveModel) -> CoreResult<episodes::Model> {
        let saved = model.save(&self.conn).await?;
        saved.try_into_model().map_err(CoreError::from)
    }

    pub async fn soft_delete_to_trash(&self, id: i32) -> CoreResult<()> {
        let Some(m) = self.get_by_id(id).await? else {
            return Err(CoreError::NotFound(format!("episode {id}")));
        };
        let payload =
            serde_json::to_string(&m).map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        crate::db::repositories::trash::insert(&self.conn, "Episode", id, &payload).await?;
        Episodes::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    /// Application-level cascade for `Episode *→1 Series` (§3): trashing a
    /// Series moves each of its episodes to `Trash` individually rather
    /// than a DB-level `ON DELETE CASCADE`, so every episode keeps its own
    /// restorable snapshot.
    pub async fn trash_all_for_series(&self, series_id: i32) -> CoreResult<usize> {
        let episodes = self.list_by_series(series_id).await?;
        let count = episodes.len();
        for ep in episodes {
            self.soft_delete_to_trash(ep.id).await?;
        }
        Ok(count)
    }

    pub async fn update_file_path(&self, id: i32, path: &str) -> CoreResult<()> {
        let mut am: episodes::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("episode {id}")))?
            .into();
        am.file_path = Set(Some(path.to_string()));
        am.updated_at = Set(chrono::Utc::now().to_rfc3339());
        am.update(&self.conn).await?;
        Ok(())
    }
}
