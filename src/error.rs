//! Error types shared across the backend.
//!
//! Persistence and model failures are kept as separate enums so callers can
//! tell a transient environment problem (`StoreError::Io`, `LlmError::Api`)
//! from a permanent one (`StoreError::Json`, a corrupt document).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("chat completion request failed: {0}")]
    Api(#[from] async_openai::error::OpenAIError),
    #[error("model returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("chat not found: {0}")]
    ChatNotFound(String),
    #[error("chat is not in the order ledger: {0}")]
    NotInLedger(String),
    #[error("a response is already being generated for this chat")]
    Busy,
    #[error("generation cancelled")]
    Cancelled,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}
