//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use quill::indexer::IndexOptions;
use quill::retry::RetryConfig;
use quill_core::document::{DocumentStore, InMemoryDocumentStore};
use quill_core::embedding::{EmbeddingError, EmbeddingModel};
use quill_core::models::DocumentEntry;

// ─── Embedding models ───────────────────────────────────────────────

/// How a [`StubModel`] answers `embed` calls.
pub enum Behavior {
    /// Deterministic vector derived from the text.
    Normal,
    /// Every call fails with an authentication error.
    Auth,
    /// Every call is rate limited.
    AlwaysRateLimited,
    /// The first `n` calls are rate limited, later calls succeed.
    RateLimitedTimes(usize),
    /// Calls whose text contains the marker fail with a provider error.
    FailOn(&'static str),
    /// Vectors have one dimension too many.
    WrongDimension,
    /// Call number `n` (1-based) cancels the token, then succeeds.
    CancelOnCall(usize, CancellationToken),
}

/// Embedding model that counts its calls.
pub struct StubModel {
    id: String,
    dims: usize,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn new(id: &str, behavior: Behavior) -> Self {
        Self {
            id: id.to_string(),
            dims: 8,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn normal() -> Self {
        Self::new("stub/hash-8", Behavior::Normal)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Fixed-length vector with strictly positive components.
fn hash_vector(text: &str, dims: usize) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    (0..dims).map(|i| digest[i % digest.len()] as f32 + 1.0).collect()
}

#[async_trait]
impl EmbeddingModel for StubModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.behavior {
            Behavior::Normal => Ok(hash_vector(text, self.dims)),
            Behavior::Auth => Err(EmbeddingError::Auth("HTTP 401: invalid api key".into())),
            Behavior::AlwaysRateLimited => Err(EmbeddingError::RateLimited("HTTP 429".into())),
            Behavior::RateLimitedTimes(n) if call <= *n => {
                Err(EmbeddingError::RateLimited("HTTP 429".into()))
            }
            Behavior::RateLimitedTimes(_) => Ok(hash_vector(text, self.dims)),
            Behavior::FailOn(marker) if text.contains(marker) => Err(EmbeddingError::Provider {
                status: Some(400),
                message: "input rejected".into(),
            }),
            Behavior::FailOn(_) => Ok(hash_vector(text, self.dims)),
            Behavior::WrongDimension => Ok(hash_vector(text, self.dims + 1)),
            Behavior::CancelOnCall(n, token) => {
                if call == *n {
                    token.cancel();
                }
                Ok(hash_vector(text, self.dims))
            }
        }
    }
}

/// Bag-of-words embedder: each lowercased word is hashed into one of 256
/// buckets. Texts with the same words get identical vectors.
pub struct BagOfWordsModel {
    calls: AtomicUsize,
}

impl BagOfWordsModel {
    pub const DIMS: usize = 256;

    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for BagOfWordsModel {
    fn id(&self) -> &str {
        "stub/bag-of-words"
    }

    fn dimension(&self) -> usize {
        Self::DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; Self::DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let bucket = u16::from_le_bytes([digest[0], digest[1]]) as usize % Self::DIMS;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

// ─── Document stores ────────────────────────────────────────────────

/// In-memory documents where reading one path always fails.
pub struct BrokenReadStore {
    pub inner: InMemoryDocumentStore,
    pub broken: &'static str,
}

#[async_trait]
impl DocumentStore for BrokenReadStore {
    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        self.inner.list_documents().await
    }

    async fn read(&self, path: &str) -> Result<String> {
        if path == self.broken {
            return Err(anyhow!("permission denied"));
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        self.inner.write(path, content).await
    }
}

// ─── Options ────────────────────────────────────────────────────────

/// Index options with millisecond backoff so retry tests stay fast.
pub fn fast_options() -> IndexOptions {
    IndexOptions {
        retry: RetryConfig::default().with_initial_backoff(Duration::from_millis(1)),
        ..Default::default()
    }
}
