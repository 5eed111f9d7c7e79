use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema \"{0}\" already exists")]
    SchemaExists(String),

    #[error("bundle {name} not found at {}. Please download or clone it first.", path.display())]
    BundleNotFound { name: String, path: PathBuf },

    #[error("invalid {entity} name '{name}': {reason}")]
    InvalidIdentifier {
        entity: &'static str,
        name: String,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("installation ledger is locked by another process ({})", .0.display())]
    LedgerLocked(PathBuf),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
