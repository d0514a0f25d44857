//! Error taxonomy for indexing and querying.
//!
//! Store, config, and I/O plumbing returns `anyhow::Result` like the rest
//! of the crate. The indexer and query engine surface [`QuillError`] so
//! callers can react to the distinguished cases: prompt for provider
//! settings on [`QuillError::ProviderConfig`], show a warning on
//! [`QuillError::RateLimited`].

use quill_core::embedding::EmbeddingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuillError {
    /// Missing or invalid credentials, or an unusable provider setup.
    /// Never retried.
    #[error("embedding provider is not configured correctly: {0}")]
    ProviderConfig(String),

    /// Still rate limited after every retry. Chunks already stored are kept.
    #[error("embedding provider rate limit exceeded: {0}")]
    RateLimited(String),

    /// A chunk reached the embedder empty or with null bytes.
    #[error("invalid chunk content in {path} (lines {start_line}-{end_line}): {reason}")]
    ChunkContent {
        path: String,
        start_line: usize,
        end_line: usize,
        reason: &'static str,
    },

    #[error("failed to list documents: {0}")]
    DocumentList(#[source] anyhow::Error),

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error("failed to read document {path}: {source}")]
    DocumentRead {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("embedding model {model} returned {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Embedding(EmbeddingError),

    #[error("vector store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("indexing cancelled")]
    Cancelled,
}

impl QuillError {
    pub fn is_provider_config(&self) -> bool {
        matches!(self, QuillError::ProviderConfig(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuillError::RateLimited(_))
    }
}

impl From<EmbeddingError> for QuillError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Auth(msg) | EmbeddingError::Config(msg) => {
                QuillError::ProviderConfig(msg)
            }
            EmbeddingError::RateLimited(msg) => QuillError::RateLimited(msg),
            other => QuillError::Embedding(other),
        }
    }
}

pub type QuillResult<T> = Result<T, QuillError>;
