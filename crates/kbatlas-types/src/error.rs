use thiserror::Error;

/// Errors surfaced by builder operations (store, step controller, publisher).
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("builder session or template not found")]
    NotFound,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("version conflict: expected {expected}, stored {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("deployment failed: {0}")]
    DeploymentFailed(String),
}

impl From<RepositoryError> for BuilderError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => BuilderError::NotFound,
            RepositoryError::VersionConflict { expected, actual } => {
                BuilderError::Conflict { expected, actual }
            }
            other => BuilderError::Persistence(other.to_string()),
        }
    }
}

/// Errors from repository operations (used by trait definitions in kbatlas-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("version conflict: expected {expected}, stored {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

/// Errors from the external agent-execution provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to parse provider response: {0}")]
    Deserialization(String),
}
