use thiserror::Error;

/// Closed set of error kinds the core ever returns. CLI/daemon adapters
/// translate these into exit codes; nothing downstream invents new kinds.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0:?}")]
    Conflict(ConflictKind),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("external catalog rate limited: {0}")]
    ExternalRateLimited(String),

    #[error("external catalog transient error: {0}")]
    ExternalTransient(String),

    #[error("external catalog permanent error: {0}")]
    ExternalPermanent(String),

    #[error("store consistency violation: {0}")]
    StoreConsistency(String),

    #[error("filesystem error: {0}")]
    FilesystemIo(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Pre-flight conflict kinds detected by the transferer (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    Duplicate { existing_path: String },
    NameCollision { existing_path: String },
    SimilarContent { existing_path: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<sea_orm::DbErr> for CoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::StoreConsistency(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::FilesystemIo(e.to_string())
    }
}
