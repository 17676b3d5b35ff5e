use ksb_types::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("message {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
