use crate::db::repositories::episodes::EpisodeRepository;
use crate::entities::{prelude::*, series};
use crate::error::{CoreError, CoreResult};
use crate::matcher::normalize::search_variants;
use crate::parser::filename::clean_title;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TryIntoModel,
};

pub struct SeriesRepository {
    conn: DatabaseConnection,
}

impl SeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> CoreResult<Option<series::Model>> {
        Ok(Series::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_by_external_id(
        &self,
        tmdb_id: Option<&str>,
        tvdb_id: Option<&str>,
    ) -> CoreResult<Option<series::Model>> {
        let mut cond = Condition::any();
        let mut any = false;
        if let Some(id) = tmdb_id {
            cond = cond.add(series::Column::TmdbId.eq(id));
            any = true;
        }
        if let Some(id) = tvdb_id {
            cond = cond.add(series::Column::TvdbId.eq(id));
            any = true;
        }
        if !any {
            return Ok(None);
        }
        Ok(Series::find().filter(cond).one(&self.conn).await?)
    }

    pub async fn search_by_title(&self, query: &str) -> CoreResult<Vec<series::Model>> {
        let mut cond = Condition::any();
        for variant in search_variants(query) {
            cond = cond.add(series::Column::Title.contains(&variant));
        }
        Ok(Series::find().filter(cond).all(&self.conn).await?)
    }

    pub async fn list_all(&self) -> CoreResult<Vec<series::Model>> {
        Ok(Series::find().all(&self.conn).await?)
    }

    pub async fn save(&self, mut model: series::ActiveModel) -> CoreResult<series::Model> {
        if let Set(ref title) = model.title {
            model.title = Set(clean_title(title));
        }
        let saved = model.save(&self.conn).await?;
        saved.try_into_model().map_err(CoreError::from)
    }

    /// Soft-deletes the Series and cascades a soft-delete to every one of
    /// its Episodes (§3 relationship note).
    pub async fn soft_delete_to_trash(&self, id: i32) -> CoreResult<usize> {
        let Some(m) = self.get_by_id(id).await? else {
            return Err(CoreError::NotFound(format!("series {id}")));
        };
        let episodes_trashed = EpisodeRepository::new(self.conn.clone())
            .trash_all_for_series(id)
            .await?;
        let payload =
            serde_json::to_string(&m).map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        crate::db::repositories::trash::insert(&self.conn, "Series", id, &payload).await?;
        Series::delete_by_id(id).exec(&self.conn).await?;
        Ok(episodes_trashed)
    }
}
