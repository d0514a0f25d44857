//! Embedding model trait, provider error taxonomy, and vector utilities.
//!
//! Concrete providers (OpenAI-compatible HTTP) live in the `quill` app
//! crate. Tests and embedders of this crate supply their own
//! [`EmbeddingModel`] implementations.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by an embedding provider.
///
/// The variants drive the indexer's retry policy and let callers tell
/// configuration problems (prompt the user for settings) apart from
/// transient failures.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Missing or rejected API key.
    #[error("embedding provider rejected credentials: {0}")]
    Auth(String),

    /// Provider is not usable as configured (e.g. base URL unset).
    #[error("embedding provider misconfigured: {0}")]
    Config(String),

    #[error("embedding provider rate limited: {0}")]
    RateLimited(String),

    /// Network failure or server-side error worth retrying.
    #[error("transient embedding failure: {0}")]
    Transient(String),

    /// Any other provider response (non-retryable).
    #[error(
        "embedding provider error{}: {message}",
        .status.map(|s| format!(" {}", s)).unwrap_or_default()
    )]
    Provider {
        status: Option<u16>,
        message: String,
    },
}

impl EmbeddingError {
    /// Configuration-class errors are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmbeddingError::Auth(_) | EmbeddingError::Config(_))
    }
}

/// A model that maps text to a fixed-length vector.
///
/// The `id` names the vector namespace: chunks embedded by different
/// models are stored and searched separately.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Model identifier (e.g. `"openai/text-embedding-3-small"`).
    fn id(&self) -> &str;

    /// Length of every vector returned by [`embed`](EmbeddingModel::embed).
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Whether a failed call should be retried with backoff.
    ///
    /// Providers with their own error conventions override this. The
    /// default retries rate limits and transient failures only.
    fn is_retryable(&self, err: &EmbeddingError) -> bool {
        matches!(
            err,
            EmbeddingError::RateLimited(_) | EmbeddingError::Transient(_)
        )
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Encode a float vector as little-endian f32 bytes.
///
/// ```rust
/// use quill_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode bytes written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
