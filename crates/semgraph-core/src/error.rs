use thiserror::Error;

/// Shared error type for every crate in the workspace. Mirrors the
/// taxonomy in spec.md §7: validation errors are never retried, I/O and
/// extraction errors are retried by callers with a `RetryPolicy`, and
/// LLM errors fall back rather than propagate.
#[derive(Error, Debug)]
pub enum CodeGraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot codec error: {0}")]
    SnapshotCodec(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("graph store error: {0}")]
    GraphStore(String),

    #[error("relational store error: {0}")]
    RelationalStore(String),

    #[error("vector index error: {0}")]
    VectorIndex(String),

    #[error("llm provider error: {0}")]
    Llm(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CodeGraphError {
    /// Whether an activity invocation that failed with this error is
    /// eligible for the exponential-backoff retry in spec.md §5.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CodeGraphError::Io(_)
                | CodeGraphError::GraphStore(_)
                | CodeGraphError::RelationalStore(_)
                | CodeGraphError::VectorIndex(_)
                | CodeGraphError::Llm(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodeGraphError>;
