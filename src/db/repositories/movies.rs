use crate::entities::{movies, prelude::*};
use crate::error::{CoreError, CoreResult};
use crate::matcher::normalize::search_variants;
use crate::parser::filename::clean_title;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TryIntoModel,
};

pub struct MovieRepository {
    conn: DatabaseConnection,
}

impl MovieRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> CoreResult<Option<movies::Model>> {
        Ok(Movies::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_by_external_id(&self, tmdb_id: Option<&str>, imdb_id: Option<&str>) -> CoreResult<Option<movies::Model>> {
        let mut cond = Condition::any();
        let mut any = false;
        if let Some(id) = tmdb_id {
            cond = cond.add(movies::Column::TmdbId.eq(id));
            any = true;
        }
        if let Some(id) = imdb_id {
            cond = cond.add(movies::Column::ImdbId.eq(id));
            any = true;
        }
        if !any {
            return Ok(None);
        }
        Ok(Movies::find().filter(cond).one(&self.conn).await?)
    }

    /// Substring search across all Unicode-aware variants of `query`
    /// (§4.8) — repositories OR over the variant set because the
    /// underlying SQL engine only case-folds ASCII.
    pub async fn search_by_title(&self, query: &str) -> CoreResult<Vec<movies::Model>> {
        let mut cond = Condition::any();
        for variant in search_variants(query) {
            cond = cond.add(movies::Column::Title.contains(&variant));
        }
        Ok(Movies::find().filter(cond).all(&self.conn).await?)
    }

    pub async fn list_watched(&self, watched: bool) -> CoreResult<Vec<movies::Model>> {
        Ok(Movies::find()
            .filter(movies::Column::Watched.eq(watched))
            .all(&self.conn)
            .await?)
    }

    pub async fn list_all(&self) -> CoreResult<Vec<movies::Model>> {
        Ok(Movies::find().all(&self.conn).await?)
    }

    pub async fn save(&self, mut model: movies::ActiveModel) -> CoreResult<movies::Model> {
        if let Set(ref title) = model.title {
            model.title = Set(clean_title(title));
        }
        let saved = model.save(&self.conn).await?;
        saved.try_into_model().map_err(CoreError::from)
    }

    pub async fn soft_delete_to_trash(&self, id: i32) -> CoreResult<()> {
        let Some(m) = self.get_by_id(id).await? else {
            return Err(CoreError::NotFound(format!("movie {id}")));
        };
        let payload = serde_json::to_string(&m)
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        crate::db::repositories::trash::insert(
            &self.conn,
            "Movie",
            id,
            &payload,
        )
        .await?;
        Movies::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}
