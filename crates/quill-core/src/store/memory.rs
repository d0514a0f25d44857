//! In-memory [`VectorStore`] implementation for tests and embedders.
//!
//! Chunks are kept per model id in a `HashMap` behind a single
//! `parking_lot::RwLock`, so every mutation is atomic with respect to
//! searches. Search is brute-force cosine similarity.

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::{Chunk, SearchOptions, SimilarityResult};

use super::{rank_chunks, VectorStore};

/// In-memory vector store.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    namespaces: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored for `model_id`.
    pub fn len(&self, model_id: &str) -> usize {
        self.namespaces.read().get(model_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, model_id: &str) -> bool {
        self.len(model_id) == 0
    }

    /// Snapshot of a namespace, sorted by path and start line.
    pub fn snapshot(&self, model_id: &str) -> Vec<Chunk> {
        let mut chunks = self
            .namespaces
            .read()
            .get(model_id)
            .cloned()
            .unwrap_or_default();
        chunks.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.metadata.start_line.cmp(&b.metadata.start_line))
        });
        chunks
    }
}

fn validate_all(chunks: &[Chunk]) -> Result<()> {
    chunks.iter().try_for_each(Chunk::validate)
}

fn push_all(namespaces: &mut HashMap<String, Vec<Chunk>>, chunks: &[Chunk]) {
    for c in chunks {
        namespaces
            .entry(c.embedding_model_id.clone())
            .or_default()
            .push(c.clone());
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, chunks: &[Chunk]) -> Result<()> {
        validate_all(chunks)?;
        push_all(&mut self.namespaces.write(), chunks);
        Ok(())
    }

    async fn delete_by_paths(&self, paths: &[String], model_id: &str) -> Result<()> {
        let doomed: HashSet<&str> = paths.iter().map(String::as_str).collect();
        if let Some(chunks) = self.namespaces.write().get_mut(model_id) {
            chunks.retain(|c| !doomed.contains(c.path.as_str()));
        }
        Ok(())
    }

    async fn replace_paths(
        &self,
        model_id: &str,
        paths: &[String],
        chunks: &[Chunk],
    ) -> Result<()> {
        validate_all(chunks)?;
        let doomed: HashSet<&str> = paths.iter().map(String::as_str).collect();
        let mut namespaces = self.namespaces.write();
        if let Some(existing) = namespaces.get_mut(model_id) {
            existing.retain(|c| !doomed.contains(c.path.as_str()));
        }
        push_all(&mut namespaces, chunks);
        tracing::debug!(
            model = model_id,
            paths = paths.len(),
            chunks = chunks.len(),
            "Replaced paths"
        );
        Ok(())
    }

    async fn clear(&self, model_id: &str) -> Result<()> {
        if let Some(dropped) = self.namespaces.write().remove(model_id) {
            tracing::debug!(model = model_id, chunks = dropped.len(), "Cleared namespace");
        }
        Ok(())
    }

    async fn list_indexed_paths(&self, model_id: &str) -> Result<Vec<String>> {
        let namespaces = self.namespaces.read();
        let paths: BTreeSet<&str> = namespaces
            .get(model_id)
            .map(|chunks| chunks.iter().map(|c| c.path.as_str()).collect())
            .unwrap_or_default();
        Ok(paths.into_iter().map(str::to_string).collect())
    }

    async fn chunks_for_path(&self, path: &str, model_id: &str) -> Result<Vec<Chunk>> {
        let namespaces = self.namespaces.read();
        let mut chunks: Vec<Chunk> = namespaces
            .get(model_id)
            .map(|all| all.iter().filter(|c| c.path == path).cloned().collect())
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.metadata.start_line);
        Ok(chunks)
    }

    async fn similarity_search(
        &self,
        query: &[f32],
        model_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SimilarityResult>> {
        let namespaces = self.namespaces.read();
        Ok(namespaces
            .get(model_id)
            .map(|chunks| rank_chunks(query, chunks, options))
            .unwrap_or_default())
    }
}
