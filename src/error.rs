//! Error types for the AutoFi agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Market oracle error: {0}")]
    Oracle(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error("Blocked: {0}")]
    Blocked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Narrator error: {0}")]
    Narrator(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
