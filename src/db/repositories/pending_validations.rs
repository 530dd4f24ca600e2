use crate::entities::{pending_validations, prelude::*};
use crate::error::{CoreError, CoreResult};
use crate::models::CandidateSnapshot;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TryIntoModel,
};

pub struct PendingValidationRepository {
    conn: DatabaseConnection,
}

impl PendingValidationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> CoreResult<Option<pending_validations::Model>> {
        Ok(PendingValidations::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list_by_status(&self, status: &str) -> CoreResult<Vec<pending_validations::Model>> {
        Ok(PendingValidations::find()
            .filter(pending_validations::Column::Status.eq(status))
            .all(&self.conn)
            .await?)
    }

    pub async fn list_auto_validated(&self) -> CoreResult<Vec<pending_validations::Model>> {
        Ok(PendingValidations::find()
            .filter(pending_validations::Column::Status.eq("validated"))
            .filter(pending_validations::Column::AutoValidated.eq(true))
            .all(&self.conn)
            .await?)
    }

    pub async fn list_cascade_siblings(
        &self,
        cascade_root: i32,
    ) -> CoreResult<Vec<pending_validations::Model>> {
        Ok(PendingValidations::find()
            .filter(pending_validations::Column::CascadeRoot.eq(cascade_root))
            .all(&self.conn)
            .await?)
    }

    pub async fn list_pending_by_series_group(
        &self,
        series_group_key: &str,
    ) -> CoreResult<Vec<pending_validations::Model>> {
        Ok(PendingValidations::find()
            .filter(pending_validations::Column::SeriesGroupKey.eq(series_group_key))
            .filter(pending_validations::Column::Status.eq("pending"))
            .all(&self.conn)
            .await?)
    }

    pub async fn create(
        &self,
        video_file_id: i32,
        candidates: &[CandidateSnapshot],
        series_group_key: Option<&str>,
    ) -> CoreResult<pending_validations::Model> {
        let candidates_json = serde_json::to_string(candidates)
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();
        let model = pending_validations::ActiveModel {
            video_file_id: Set(video_file_id),
            status: Set("pending".to_string()),
            auto_validated: Set(false),
            selected_candidate_id: Set(None),
            candidates: Set(candidates_json),
            cascade_root: Set(None),
            series_group_key: Set(series_group_key.map(str::to_string)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.save(&self.conn).await?;
        saved.try_into_model().map_err(CoreError::from)
    }

    pub async fn mark_validated(
        &self,
        id: i32,
        candidate_external_id: &str,
        auto_validated: bool,
        cascade_root: Option<i32>,
    ) -> CoreResult<pending_validations::Model> {
        let mut am: pending_validations::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {id}")))?
            .into();
        am.status = Set("validated".to_string());
        am.selected_candidate_id = Set(Some(candidate_external_id.to_string()));
        am.auto_validated = Set(auto_validated);
        am.cascade_root = Set(cascade_root);
        am.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let saved = am.update(&self.conn).await?;
        Ok(saved)
    }

    pub async fn mark_rejected(&self, id: i32) -> CoreResult<pending_validations::Model> {
        let mut am: pending_validations::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {id}")))?
            .into();
        am.status = Set("rejected".to_string());
        am.selected_candidate_id = Set(None);
        am.auto_validated = Set(false);
        am.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let saved = am.update(&self.conn).await?;
        Ok(saved)
    }

    pub async fn reset_to_pending(&self, id: i32) -> CoreResult<pending_validations::Model> {
        let mut am: pending_validations::ActiveModel = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {id}")))?
            .into();
        am.status = Set("pending".to_string());
        am.selected_candidate_id = Set(None);
        am.auto_validated = Set(false);
        am.cascade_root = Set(None);
        am.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let saved = am.update(&self.conn).await?;
        Ok(saved)
    }

    pub fn decode_candidates(model: &pending_validations::Model) -> Vec<CandidateSnapshot> {
        serde_json::from_str(&model.candidates).unwrap_or_default()
    }
}
