use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogSource {
    Tmdb,
    Tvdb,
    Imdb,
}

/// Minimal view of an external catalog entry, serialized alongside a
/// `PendingValidation` so the operator can render candidates without
/// re-calling the upstream catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub source: CatalogSource,
    pub external_id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub score: f64,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub cast_summary: Option<String>,
    pub duration_seconds: Option<f64>,
    /// Largest season's episode count the catalog declares, when this
    /// candidate is a series (used by the §4.3 episode-envelope rule).
    pub max_episode_count: Option<i32>,
    /// Upstream popularity signal (TMDB's `vote_count`; 0 where the
    /// catalog has no equivalent), used as a tie-break in `rank_candidates`.
    #[serde(default)]
    pub vote_count: i64,
}
