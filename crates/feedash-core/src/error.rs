use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {table} rule: {reason}")]
    InvalidRule { table: &'static str, reason: String },

    #[error("config file not found: {0}")]
    ConfigNotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("invalid range {0:?}: expected `min-max` or `min+`")]
    InvalidRange(String),

    #[error("unknown sort key {0:?}")]
    UnknownSortKey(String),
}

impl CoreError {
    pub(crate) fn invalid(table: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            table,
            reason: reason.into(),
        }
    }
}
