//! Error types for the `persona-rag` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A call to an external service did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out, e.g. `embed`.
        operation: String,
        /// The configured deadline.
        after: Duration,
    },

    /// A search was issued before the collection was ever built.
    #[error("Index not built: collection '{collection}' has no data yet")]
    IndexNotBuilt {
        /// The collection that was queried.
        collection: String,
    },

    /// A rebuild was requested while another rebuild was still running.
    #[error("Rebuild already in progress")]
    RebuildInProgress,

    /// A rebuild failed; the previous index is still the state of record.
    #[error("Rebuild failed: {0}")]
    RebuildFailed(#[source] Box<RagError>),

    /// The personal record exists but could not be read or parsed.
    #[error("Malformed record at {}: {message}", path.display())]
    MalformedRecord {
        /// Location of the offending record.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error, including missing credentials.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The chat completion service failed.
    #[error("Completion error ({provider}): {message}")]
    Completion {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A background task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// The service was used after `close()`.
    #[error("Service is closed")]
    Closed,
}

impl RagError {
    /// Whether retrying the same call later may succeed.
    ///
    /// Timeouts and transport-level failures of external services are
    /// retryable; configuration and data errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Timeout { .. }
            | RagError::EmbeddingError { .. }
            | RagError::VectorStoreError { .. }
            | RagError::Completion { .. }
            | RagError::RebuildInProgress => true,
            RagError::RebuildFailed(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
