use thiserror::Error;

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Errors raised by the persistence and pagination layer.
///
/// Every variant propagates to the caller unchanged; nothing here is retried.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed at '{path}': {reason}")]
    Validation { path: String, reason: String },

    #[error("malformed cursor: {0}")]
    MalformedCursor(String),

    #[error("cursor '{0}' does not reference an item of this list")]
    CursorNotFound(String),

    #[error("environment has no asset administration shell")]
    MissingShell,

    #[error("limit must be a positive integer")]
    InvalidLimit,

    #[error("document '{id}' stored with schema version '{tag}' cannot be read: {reason}")]
    CorruptDocument {
        id: String,
        tag: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PersistenceError {
    /// True for errors caused by the request rather than by stored data or the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::MalformedCursor(_) | Self::CursorNotFound(_) | Self::InvalidLimit
        )
    }
}
