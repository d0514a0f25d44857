//! Core data models shared by the indexer, vector stores, and query engine.
//!
//! Timestamps (`modified_time`) are milliseconds since the Unix epoch, as
//! reported by the [`DocumentStore`](crate::document::DocumentStore).
//! Line numbers are 1-indexed and inclusive.

use serde::{Deserialize, Serialize};

/// Line range of a chunk within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub start_line: usize,
    pub end_line: usize,
}

/// A persisted vector record: one embedded slice of a document.
///
/// Chunks are immutable once written. Re-indexing a document deletes and
/// replaces every chunk for its path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub modified_time: i64,
    pub content: String,
    pub embedding_model_id: String,
    pub vector_dimension: usize,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Check the record invariants every store enforces on insert.
    ///
    /// - `vector.len() == vector_dimension`
    /// - `1 <= start_line <= end_line`
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vector.len() != self.vector_dimension {
            anyhow::bail!(
                "chunk {} of {}: vector has {} dimensions, expected {}",
                self.id,
                self.path,
                self.vector.len(),
                self.vector_dimension
            );
        }
        if self.metadata.start_line == 0 || self.metadata.start_line > self.metadata.end_line {
            anyhow::bail!(
                "chunk {} of {}: invalid line range {}..={}",
                self.id,
                self.path,
                self.metadata.start_line,
                self.metadata.end_line
            );
        }
        Ok(())
    }
}

/// A chunk matched by a similarity search, without its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub id: String,
    pub path: String,
    pub modified_time: i64,
    pub content: String,
    pub embedding_model_id: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub similarity: f32,
}

impl SimilarityResult {
    pub fn from_chunk(chunk: &Chunk, similarity: f32) -> Self {
        Self {
            id: chunk.id.clone(),
            path: chunk.path.clone(),
            modified_time: chunk.modified_time,
            content: chunk.content.clone(),
            embedding_model_id: chunk.embedding_model_id.clone(),
            metadata: chunk.metadata,
            similarity,
        }
    }
}

/// Progress of an indexing run, emitted after every embedded chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexProgress {
    pub completed_chunks: usize,
    pub total_chunks: usize,
    pub total_files: usize,
}

/// A document as listed by a [`DocumentStore`](crate::document::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub path: String,
    pub modified_time: i64,
}

/// Restricts a similarity search to files and/or folders.
///
/// A chunk matches when its path equals one of `files` OR lies under one
/// of `folders`. When both lists are empty the scope imposes no
/// restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub folders: Vec<String>,
}

impl SearchScope {
    pub fn files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            folders: Vec::new(),
        }
    }

    pub fn folders<I, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: Vec::new(),
            folders: folders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Whether `path` falls inside this scope.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.files.iter().any(|f| f == path) {
            return true;
        }
        self.folders.iter().any(|folder| {
            let folder = folder.trim_end_matches('/');
            folder.is_empty()
                || path
                    .strip_prefix(folder)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Parameters for [`VectorStore::similarity_search`](crate::store::VectorStore::similarity_search).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Results scoring below this are dropped.
    pub min_similarity: f32,
    /// Maximum number of results.
    pub limit: usize,
    pub scope: Option<SearchScope>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_similarity: 0.0,
            limit: 10,
            scope: None,
        }
    }
}
