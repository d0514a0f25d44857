//! Vector storage abstraction for Quill.
//!
//! The [`VectorStore`] trait holds embedded [`Chunk`]s and answers cosine
//! similarity queries. Every operation takes the embedding model id: each
//! model's chunks live in a separate namespace, so vectors produced by
//! different models (or of different dimensions) are never compared.
//!
//! Implementations must be `Send + Sync` and give read-your-writes
//! consistency within a process.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, SearchOptions, SimilarityResult};

/// Abstract storage backend for embedded chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Append a batch of chunks (no dedup) |
/// | [`delete_by_paths`](VectorStore::delete_by_paths) | Drop every chunk of the given paths |
/// | [`replace_paths`](VectorStore::replace_paths) | Atomically swap the chunks of a set of paths |
/// | [`clear`](VectorStore::clear) | Drop a model's whole namespace |
/// | [`list_indexed_paths`](VectorStore::list_indexed_paths) | Paths with at least one chunk |
/// | [`chunks_for_path`](VectorStore::chunks_for_path) | All chunks of one path |
/// | [`similarity_search`](VectorStore::similarity_search) | Ranked cosine similarity search |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append chunks. Callers delete conflicting chunks first.
    ///
    /// Every chunk is validated with [`Chunk::validate`]; an invalid chunk
    /// rejects the whole batch.
    async fn insert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Remove all chunks of `paths` for `model_id`.
    async fn delete_by_paths(&self, paths: &[String], model_id: &str) -> Result<()>;

    /// Remove the chunks of `paths` and insert `chunks` as one step.
    ///
    /// Concurrent searches observe either the old or the new chunks of a
    /// path, never neither. The default implementation is not atomic;
    /// backends with locking or transactions override it.
    async fn replace_paths(
        &self,
        model_id: &str,
        paths: &[String],
        chunks: &[Chunk],
    ) -> Result<()> {
        self.delete_by_paths(paths, model_id).await?;
        self.insert(chunks).await
    }

    /// Remove every chunk for `model_id`.
    async fn clear(&self, model_id: &str) -> Result<()>;

    /// Distinct paths that have chunks for `model_id`, sorted.
    async fn list_indexed_paths(&self, model_id: &str) -> Result<Vec<String>>;

    /// All chunks of `path` for `model_id`, ordered by start line.
    async fn chunks_for_path(&self, path: &str, model_id: &str) -> Result<Vec<Chunk>>;

    /// Rank chunks of `model_id` by cosine similarity to `query`.
    ///
    /// Results below `options.min_similarity` are dropped, the rest are
    /// sorted by similarity (descending) and truncated to `options.limit`.
    async fn similarity_search(
        &self,
        query: &[f32],
        model_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SimilarityResult>>;
}

/// Score, filter, and rank candidate chunks.
///
/// Shared by the in-process stores: skips chunks outside the scope or of
/// a different dimension than `query`, then applies the threshold, the
/// ordering (similarity desc, then path and start line for ties), and the
/// limit.
pub fn rank_chunks<'a, I>(
    query: &[f32],
    candidates: I,
    options: &SearchOptions,
) -> Vec<SimilarityResult>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut results: Vec<SimilarityResult> = candidates
        .into_iter()
        .filter(|c| c.vector.len() == query.len())
        .filter(|c| options.scope.as_ref().map_or(true, |s| s.matches(&c.path)))
        .filter_map(|c| {
            let sim = cosine_similarity(query, &c.vector);
            (sim >= options.min_similarity).then(|| SimilarityResult::from_chunk(c, sim))
        })
        .collect();
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.metadata.start_line.cmp(&b.metadata.start_line))
    });
    results.truncate(options.limit);
    results
}
