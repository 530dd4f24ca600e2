use crate::entities::{prelude::*, video_files};
use crate::error::{CoreError, CoreResult};
use crate::models::{MediaInfo, ParsedFilename};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TryIntoModel,
};

pub struct VideoFileRepository {
    conn: DatabaseConnection,
}

impl VideoFileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> CoreResult<Option<video_files::Model>> {
        Ok(VideoFiles::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_by_path(&self, path: &str) -> CoreResult<Option<video_files::Model>> {
        Ok(VideoFiles::find()
            .filter(video_files::Column::Path.eq(path))
            .one(&self.conn)
            .await?)
    }

    pub async fn get_by_hash(&self, hash: &str) -> CoreResult<Option<video_files::Model>> {
        Ok(VideoFiles::find()
            .filter(video_files::Column::FileHash.eq(hash))
            .one(&self.conn)
            .await?)
    }

    /// Creates the `VideoFile` row for a freshly scanned path, or returns
    /// the existing row unchanged if it was already discovered (the
    /// scanner re-walks the same tree on every run).
    pub async fn record_scan_result(
        &self,
        path: &str,
        filename: &str,
        size_bytes: i64,
        file_hash: Option<&str>,
        media_info: Option<&MediaInfo>,
        parsed: &ParsedFilename,
        corrected_location: bool,
    ) -> CoreResult<video_files::Model> {
        if let Some(existing) = self.get_by_path(path).await? {
            return Ok(existing);
        }
        let media_info_json = media_info
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        let parsed_json = serde_json::to_string(parsed)
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;

        let model = video_files::ActiveModel {
            path: Set(path.to_string()),
            filename: Set(filename.to_string()),
            size_bytes: Set(size_bytes),
            file_hash: Set(file_hash.map(str::to_string)),
            media_info: Set(media_info_json),
            parsed: Set(parsed_json),
            corrected_location: Set(corrected_location),
            discovered_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        let saved = model.save(&self.conn).await?;
        saved.try_into_model().map_err(CoreError::from)
    }

    pub async fn update_path(&self, id: i32, new_path: &str) -> CoreResult<()> {
        let mut am: video_files::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("video_file {id}")))?
            .into();
        am.path = Set(new_path.to_string());
        am.update(&self.conn).await?;
        Ok(())
    }

    pub async fn backfill_hash(&self, id: i32, hash: &str) -> CoreResult<()> {
        let mut am: video_files::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("video_file {id}")))?
            .into();
        am.file_hash = Set(Some(hash.to_string()));
        am.update(&self.conn).await?;
        Ok(())
    }
}
