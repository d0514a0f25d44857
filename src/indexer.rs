//! Incremental vault indexing.
//!
//! [`Indexer::reindex`] brings a model's namespace in the [`VectorStore`]
//! up to date with the [`DocumentStore`]:
//!
//! ```text
//! list documents ──▶ exclude/include globs ──▶ drop chunks of deleted paths
//!       │
//!       ▼
//! staleness (no chunks, or mtime newer than stored)
//!       │
//!       ▼
//! read ─▶ strip NUL ─▶ chunk_markdown ─▶ embed (bounded, retried)
//!       │
//!       ▼
//! replace_paths in batches, once every chunk of a path is embedded
//! ```
//!
//! Runs for the same model are serialized: a second caller waits for the
//! first and then finds nothing stale. Old chunks of a path are swapped for
//! new ones in one store call, so a concurrent search sees either version
//! but never a gap. Paths flushed before an error or cancellation stay
//! indexed; everything else is retried on the next run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use quill_core::chunk::{chunk_markdown, TextChunk};
use quill_core::document::DocumentStore;
use quill_core::embedding::EmbeddingModel;
use quill_core::models::{Chunk, ChunkMetadata, DocumentEntry, IndexProgress};
use quill_core::store::VectorStore;

use crate::error::{QuillError, QuillResult};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::retry::RetryConfig;

/// Parameters of one indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Keep only paths matching one of these globs. Empty keeps everything.
    pub include_patterns: Vec<String>,
    /// Drop paths matching any of these globs. Applied before includes.
    pub exclude_patterns: Vec<String>,
    /// Clear the model's namespace and embed every candidate.
    pub reindex_all: bool,
    /// Embedding requests in flight at once.
    pub concurrency: usize,
    /// Minimum number of chunks written per store call.
    pub batch_size: usize,
    pub retry: RetryConfig,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            reindex_all: false,
            concurrency: 8,
            batch_size: 100,
            retry: RetryConfig::default(),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Chunks embedded and written.
    pub embedded_chunks: usize,
    /// Paths whose chunks were (re)written.
    pub indexed_files: usize,
    /// Paths whose chunks were dropped because the document disappeared
    /// or became empty.
    pub deleted_paths: Vec<String>,
    /// Paths skipped because they could not be read.
    pub failed_documents: Vec<String>,
}

/// Keeps a vector store namespace in sync with a document store.
pub struct Indexer {
    documents: Arc<dyn DocumentStore>,
    store: Arc<dyn VectorStore>,
    locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// A chunk waiting for its embedding.
struct ChunkJob {
    path: String,
    modified_time: i64,
    chunk: TextChunk,
}

/// Embedded chunks of one path, held back until the path is complete.
struct PendingPath {
    expected: usize,
    chunks: Vec<Chunk>,
}

/// Complete paths not yet written to the store.
#[derive(Default)]
struct Batch {
    paths: Vec<String>,
    chunks: Vec<Chunk>,
}

impl Indexer {
    pub fn new(documents: Arc<dyn DocumentStore>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            documents,
            store,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    fn model_lock(&self, model_id: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(model_id.to_string())
            .or_default()
            .clone()
    }

    /// Index every new or changed document for `model`.
    ///
    /// # Errors
    ///
    /// - [`QuillError::ProviderConfig`] on credential or setup failures, without retry.
    /// - [`QuillError::RateLimited`] once a chunk exhausts its retries on 429s.
    /// - [`QuillError::ChunkContent`] if a chunk reaches the embedder empty or with NUL bytes.
    /// - [`QuillError::Cancelled`] when `cancel` fires.
    ///
    /// In every error case, paths already written stay written. Unreadable
    /// documents are not errors; they are listed in
    /// [`IndexSummary::failed_documents`].
    pub async fn reindex(
        &self,
        model: &dyn EmbeddingModel,
        opts: &IndexOptions,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> QuillResult<IndexSummary> {
        let model_id = model.id().to_string();
        let lock = self.model_lock(&model_id);
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QuillError::Cancelled),
            guard = lock.lock_owned() => guard,
        };

        let mut summary = IndexSummary::default();

        let listing = self
            .documents
            .list_documents()
            .await
            .map_err(QuillError::DocumentList)?;
        let candidates = filter_candidates(&listing, opts)?;
        tracing::debug!(
            model = %model_id,
            listed = listing.len(),
            candidates = candidates.len(),
            "Collected index candidates"
        );

        if opts.reindex_all {
            self.store.clear(&model_id).await.map_err(QuillError::Store)?;
        } else {
            summary.deleted_paths = self.remove_deleted(&model_id, &listing).await?;
        }

        let mut jobs = Vec::new();
        let mut pending: HashMap<String, PendingPath> = HashMap::new();
        let mut emptied = Vec::new();

        for entry in candidates {
            let existing = if opts.reindex_all {
                Vec::new()
            } else {
                self.store
                    .chunks_for_path(&entry.path, &model_id)
                    .await
                    .map_err(QuillError::Store)?
            };

            if let Some(stored) = existing.iter().map(|c| c.modified_time).max() {
                if entry.modified_time <= stored {
                    continue;
                }
            }

            let content = match self.documents.read(&entry.path).await {
                Ok(content) => content,
                Err(err) => {
                    let err = QuillError::DocumentRead {
                        path: entry.path.clone(),
                        source: err,
                    };
                    tracing::warn!(error = %err, "Skipping unreadable document");
                    summary.failed_documents.push(entry.path.clone());
                    continue;
                }
            };

            let sanitized = content.replace('\0', "");
            let chunks = chunk_markdown(&sanitized, opts.chunk_size);
            if chunks.is_empty() {
                if !existing.is_empty() {
                    emptied.push(entry.path.clone());
                }
                continue;
            }

            pending.insert(
                entry.path.clone(),
                PendingPath {
                    expected: chunks.len(),
                    chunks: Vec::with_capacity(chunks.len()),
                },
            );
            jobs.extend(chunks.into_iter().map(|chunk| ChunkJob {
                path: entry.path.clone(),
                modified_time: entry.modified_time,
                chunk,
            }));
        }

        if !emptied.is_empty() {
            self.store
                .delete_by_paths(&emptied, &model_id)
                .await
                .map_err(QuillError::Store)?;
            summary.deleted_paths.extend(emptied);
        }

        let mut state = IndexProgress {
            completed_chunks: 0,
            total_chunks: jobs.len(),
            total_files: pending.len(),
        };
        if jobs.is_empty() {
            tracing::debug!(model = %model_id, "Index is up to date");
            return Ok(summary);
        }
        tracing::info!(
            model = %model_id,
            files = state.total_files,
            chunks = state.total_chunks,
            "Embedding stale documents"
        );
        progress.report(ProgressEvent::Indexing { progress: state });

        let mut embedded = stream::iter(jobs)
            .map(|job| embed_chunk(model, &opts.retry, job))
            .buffer_unordered(opts.concurrency.max(1));

        let mut batch = Batch::default();
        let mut outcome = Ok(());

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome = Err(QuillError::Cancelled);
                    break;
                }
                next = embedded.next() => next,
            };

            let chunk = match next {
                None => break,
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    outcome = Err(err);
                    break;
                }
            };

            state.completed_chunks += 1;
            progress.report(ProgressEvent::Indexing { progress: state });

            let path = chunk.path.clone();
            let complete = match pending.get_mut(&path) {
                Some(entry) => {
                    entry.chunks.push(chunk);
                    entry.chunks.len() == entry.expected
                }
                None => false,
            };
            if complete {
                if let Some(mut done) = pending.remove(&path) {
                    done.chunks.sort_by_key(|c| c.metadata.start_line);
                    batch.paths.push(path);
                    batch.chunks.append(&mut done.chunks);
                }
            }

            if batch.chunks.len() >= opts.batch_size.max(1) {
                self.flush(&model_id, &mut batch, &mut summary).await?;
            }
        }
        drop(embedded);

        self.flush(&model_id, &mut batch, &mut summary).await?;

        if let Err(err) = outcome {
            tracing::warn!(
                model = %model_id,
                error = %err,
                indexed_files = summary.indexed_files,
                "Indexing aborted"
            );
            return Err(err);
        }

        tracing::info!(
            model = %model_id,
            files = summary.indexed_files,
            chunks = summary.embedded_chunks,
            deleted = summary.deleted_paths.len(),
            "Indexing complete"
        );
        Ok(summary)
    }

    /// Drop chunks of indexed paths the document store no longer lists.
    async fn remove_deleted(
        &self,
        model_id: &str,
        listing: &[DocumentEntry],
    ) -> QuillResult<Vec<String>> {
        let present: HashSet<&str> = listing.iter().map(|d| d.path.as_str()).collect();
        let deleted: Vec<String> = self
            .store
            .list_indexed_paths(model_id)
            .await
            .map_err(QuillError::Store)?
            .into_iter()
            .filter(|p| !present.contains(p.as_str()))
            .collect();

        if !deleted.is_empty() {
            tracing::debug!(
                model = %model_id,
                count = deleted.len(),
                "Removing chunks of deleted documents"
            );
            self.store
                .delete_by_paths(&deleted, model_id)
                .await
                .map_err(QuillError::Store)?;
        }
        Ok(deleted)
    }

    async fn flush(
        &self,
        model_id: &str,
        batch: &mut Batch,
        summary: &mut IndexSummary,
    ) -> QuillResult<()> {
        if batch.paths.is_empty() {
            return Ok(());
        }
        let Batch { paths, chunks } = std::mem::take(batch);
        self.store
            .replace_paths(model_id, &paths, &chunks)
            .await
            .map_err(QuillError::Store)?;
        tracing::debug!(
            model = %model_id,
            files = paths.len(),
            chunks = chunks.len(),
            "Flushed batch"
        );
        summary.indexed_files += paths.len();
        summary.embedded_chunks += chunks.len();
        Ok(())
    }
}

/// Apply exclude globs, then include globs (when any are given).
fn filter_candidates(
    listing: &[DocumentEntry],
    opts: &IndexOptions,
) -> QuillResult<Vec<DocumentEntry>> {
    let exclude = build_globset(&opts.exclude_patterns)?;
    let include = build_globset(&opts.include_patterns)?;
    let keep_all = opts.include_patterns.is_empty();

    Ok(listing
        .iter()
        .filter(|d| !exclude.is_match(&d.path))
        .filter(|d| keep_all || include.is_match(&d.path))
        .cloned()
        .collect())
}

fn build_globset(patterns: &[String]) -> QuillResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

async fn embed_chunk(
    model: &dyn EmbeddingModel,
    retry: &RetryConfig,
    job: ChunkJob,
) -> QuillResult<Chunk> {
    let ChunkJob {
        path,
        modified_time,
        chunk,
    } = job;

    let invalid = if chunk.content.is_empty() {
        Some("empty content")
    } else if chunk.content.contains('\0') {
        Some("content contains NUL bytes")
    } else {
        None
    };
    if let Some(reason) = invalid {
        return Err(QuillError::ChunkContent {
            path,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            reason,
        });
    }

    let vector = retry
        .retry_if(|| model.embed(&chunk.content), |err| model.is_retryable(err))
        .await?;

    if vector.len() != model.dimension() {
        return Err(QuillError::DimensionMismatch {
            model: model.id().to_string(),
            expected: model.dimension(),
            actual: vector.len(),
        });
    }

    Ok(Chunk {
        id: uuid::Uuid::new_v4().to_string(),
        path,
        modified_time,
        content: chunk.content,
        embedding_model_id: model.id().to_string(),
        vector_dimension: vector.len(),
        vector,
        metadata: ChunkMetadata {
            start_line: chunk.start_line,
            end_line: chunk.end_line,
        },
    })
}
