use thiserror::Error;

/// Main error type for ApiScope operations
#[derive(Error, Debug)]
pub enum ApiScopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Check failed: {0}")]
    CheckFailed(String),
}

pub type Result<T> = std::result::Result<T, ApiScopeError>;
