//! Retrieval over the indexed vault.
//!
//! [`RagEngine::query`] always refreshes the index first, so results
//! reflect the vault as it is now. Query-time errors are returned as-is;
//! the only retries happen inside the indexer's per-chunk embedding calls.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use quill_core::document::DocumentStore;
use quill_core::embedding::EmbeddingModel;
use quill_core::models::{SearchOptions, SearchScope, SimilarityResult};
use quill_core::store::VectorStore;

use crate::config::Config;
use crate::error::{QuillError, QuillResult};
use crate::indexer::{IndexOptions, IndexSummary, Indexer};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Retrieval settings for [`RagEngine::query`].
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub index: IndexOptions,
    pub min_similarity: f32,
    pub limit: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            index: IndexOptions::default(),
            min_similarity: 0.0,
            limit: 10,
        }
    }
}

impl RagSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index: config.index_options(false),
            min_similarity: config.retrieval.min_similarity,
            limit: config.retrieval.limit,
        }
    }
}

/// Query engine owning the indexer, the store, and the embedding model.
///
/// The same model embeds documents and queries, so a query only ever
/// meets vectors from its own namespace.
pub struct RagEngine {
    indexer: Indexer,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn EmbeddingModel>,
    settings: RagSettings,
}

impl RagEngine {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn EmbeddingModel>,
        settings: RagSettings,
    ) -> Self {
        Self {
            indexer: Indexer::new(documents, store.clone()),
            store,
            model,
            settings,
        }
    }

    pub fn model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.model
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Run the indexer with the configured options.
    pub async fn reindex(
        &self,
        reindex_all: bool,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> QuillResult<IndexSummary> {
        let opts = IndexOptions {
            reindex_all,
            ..self.settings.index.clone()
        };
        self.indexer
            .reindex(self.model.as_ref(), &opts, progress, cancel)
            .await
    }

    /// Refresh the index, then return the chunks most similar to `text`.
    ///
    /// Emits `ReadingInputs`, `Indexing` per embedded chunk, `Querying`,
    /// then `QueryingDone` with the results. On error, emits `Idle` before
    /// returning.
    ///
    /// `cancel` stops the refresh; chunks flushed before it fired stay in
    /// the store and the query returns [`QuillError::Cancelled`].
    pub async fn query(
        &self,
        text: &str,
        scope: Option<SearchScope>,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> QuillResult<Vec<SimilarityResult>> {
        match self.run_query(text, scope, progress, cancel).await {
            Ok(results) => {
                progress.report(ProgressEvent::QueryingDone {
                    results: results.clone(),
                });
                Ok(results)
            }
            Err(err) => {
                progress.report(ProgressEvent::Idle);
                Err(err)
            }
        }
    }

    async fn run_query(
        &self,
        text: &str,
        scope: Option<SearchScope>,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> QuillResult<Vec<SimilarityResult>> {
        progress.report(ProgressEvent::ReadingInputs);
        self.reindex(false, progress, cancel).await?;
        if cancel.is_cancelled() {
            return Err(QuillError::Cancelled);
        }

        progress.report(ProgressEvent::Querying);
        let vector = self.model.embed(text).await?;
        if vector.len() != self.model.dimension() {
            return Err(QuillError::DimensionMismatch {
                model: self.model.id().to_string(),
                expected: self.model.dimension(),
                actual: vector.len(),
            });
        }

        let options = SearchOptions {
            min_similarity: self.settings.min_similarity,
            limit: self.settings.limit,
            scope: scope.filter(|s| !s.is_empty()),
        };
        let results = self
            .store
            .similarity_search(&vector, self.model.id(), &options)
            .await
            .map_err(QuillError::Store)?;

        tracing::debug!(
            model = %self.model.id(),
            results = results.len(),
            "Query complete"
        );
        Ok(results)
    }
}
