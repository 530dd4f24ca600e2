use crate::entities::{catalog_cache, prelude::*};
use crate::error::{CoreError, CoreResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// Persistent tier of the Catalog Client's two-tier cache (§4.2). The
/// in-memory LRU that fronts this lives in `clients::cache`; this
/// repository is its store-backed fallback, with a 24h freshness window
/// mirroring the teacher's SeaDex cache pattern.
pub struct CatalogCacheRepository {
    conn: DatabaseConnection,
}

const TTL_HOURS: i64 = 24;

impl CatalogCacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_fresh(&self, fingerprint: &str) -> CoreResult<Option<String>> {
        let threshold = chrono::Utc::now() - chrono::Duration::hours(TTL_HOURS);
        let row = CatalogCache::find_by_id(fingerprint.to_string())
            .one(&self.conn)
            .await?;
        Ok(row.and_then(|r| {
            let fetched_at = chrono::DateTime::parse_from_rfc3339(&r.fetched_at).ok()?;
            if fetched_at.with_timezone(&chrono::Utc) > threshold {
                Some(r.payload)
            } else {
                None
            }
        }))
    }

    pub async fn put(&self, fingerprint: &str, payload: &str) -> CoreResult<()> {
        let model = catalog_cache::ActiveModel {
            fingerprint: Set(fingerprint.to_string()),
            payload: Set(payload.to_string()),
            fetched_at: Set(chrono::Utc::now().to_rfc3339()),
        };
        CatalogCache::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(catalog_cache::Column::Fingerprint)
                    .update_columns([catalog_cache::Column::Payload, catalog_cache::Column::FetchedAt])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> CoreResult<u64> {
        let threshold = (chrono::Utc::now() - chrono::Duration::hours(TTL_HOURS)).to_rfc3339();
        let res = CatalogCache::delete_many()
            .filter(catalog_cache::Column::FetchedAt.lt(threshold))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}
