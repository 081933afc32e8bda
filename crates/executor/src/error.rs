use thiserror::Error;

use common::error::Error as ExpressionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigLoadError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Channel sender failed: Receiver has been dropped.")]
    ChannelSendFailed,

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}
