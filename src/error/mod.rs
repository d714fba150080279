use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural rejections raised by the investigation tree.
///
/// Unknown ids are never reported through this type; lookups return
/// `Option`/`bool` instead.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node already exists: {node_id}")]
    DuplicateNode { node_id: String },

    #[error("Tree already has root {root_id}; node {node_id} has no parent")]
    DuplicateRoot { root_id: String, node_id: String },

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of an external generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation backend failed: {0}")]
    Backend(#[from] LangbaseError),

    #[error("Malformed generation output: {message}")]
    Malformed { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type alias for generation capability calls
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;
