use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ledger document error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid ledger path: {0}")]
    InvalidPath(String),

    #[error("Flush scheduler is no longer running")]
    SchedulerClosed,

    #[error("{0}")]
    Other(String),
}
