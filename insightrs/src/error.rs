use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("query is not runnable: select at least one metric and one dimension")]
    NotRunnable,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InsightError {
    /// True for failures the user can fix by changing the selection.
    pub fn is_validation(&self) -> bool {
        matches!(self, InsightError::NotRunnable | InsightError::Validation(_))
    }
}
