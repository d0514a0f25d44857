//! End-to-end retrieval tests: index a small vault, then query it.

mod common;

use std::sync::Arc;

use common::{fast_options, BagOfWordsModel, Behavior, StubModel};
use quill::error::QuillError;
use quill::indexer::IndexOptions;
use quill::progress::{ChannelProgress, NoProgress, ProgressEvent};
use quill::rag::{RagEngine, RagSettings};
use quill_core::document::InMemoryDocumentStore;
use quill_core::embedding::EmbeddingModel;
use quill_core::models::SearchScope;
use quill_core::store::memory::InMemoryVectorStore;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

const FILE_A: &str = "# Gardening\n\n\
Tomatoes need six hours of direct sun and deep watering twice a week.\n\n\
Mulch keeps the soil moist and suppresses weeds around the beds.\n\n\
## Pests\n\n\
Aphids gather under leaves; a strong spray of water knocks them off.";

const FILE_B: &str = "The lighthouse keeper polished the brass lens every evening.";

const FILE_C: &str = "# Sourdough\n\n\
Feed the starter with equal weights of flour and water each morning.\n\n\
Bake at high heat in a covered pot for a crisp crust.\n\n\
## Storage\n\n\
Wrap cooled loaves in linen and eat them within three days.";

fn vault() -> Arc<InMemoryDocumentStore> {
    let docs = Arc::new(InMemoryDocumentStore::new());
    docs.put("garden/tomatoes.md", 1, FILE_A);
    docs.put("stories/lighthouse.md", 1, FILE_B);
    docs.put("kitchen/sourdough.md", 1, FILE_C);
    docs
}

fn settings() -> RagSettings {
    RagSettings {
        index: IndexOptions {
            chunk_size: 500,
            ..fast_options()
        },
        min_similarity: 0.0,
        limit: 10,
    }
}

fn engine(model: Arc<dyn EmbeddingModel>) -> RagEngine {
    RagEngine::new(
        vault(),
        Arc::new(InMemoryVectorStore::new()),
        model,
        settings(),
    )
}

#[tokio::test]
async fn test_exact_sentence_ranks_its_file_first() {
    let model = Arc::new(BagOfWordsModel::new());
    let engine = engine(model.clone());

    let results = engine
        .query(
            "The lighthouse keeper polished the brass lens every evening.",
            None,
            &NoProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].path, "stories/lighthouse.md");
    assert!(
        results[0].similarity > 0.9,
        "similarity was {}",
        results[0].similarity
    );
    assert!(results
        .windows(2)
        .all(|w| w[0].similarity >= w[1].similarity));
}

#[tokio::test]
async fn test_query_refreshes_index_incrementally() {
    let model = Arc::new(BagOfWordsModel::new());
    let engine = engine(model.clone());

    engine
        .query("sun", None, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    let after_first = model.calls();
    // 3 single-chunk documents plus the query.
    assert_eq!(after_first, 4);

    engine
        .query("flour", None, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(model.calls(), after_first + 1);
}

#[tokio::test]
async fn test_scope_limits_results() {
    let engine = engine(Arc::new(BagOfWordsModel::new()));

    let scope = SearchScope::files(["kitchen/sourdough.md"]);
    let files = engine
        .query("water", Some(scope), &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!files.is_empty());
    assert!(files.iter().all(|r| r.path == "kitchen/sourdough.md"));

    let scope = SearchScope::folders(["garden"]);
    let folders = engine
        .query("water", Some(scope), &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!folders.is_empty());
    assert!(folders.iter().all(|r| r.path.starts_with("garden/")));
}

#[tokio::test]
async fn test_min_similarity_and_limit() {
    let model: Arc<dyn EmbeddingModel> = Arc::new(BagOfWordsModel::new());
    let engine = RagEngine::new(
        vault(),
        Arc::new(InMemoryVectorStore::new()),
        model,
        RagSettings {
            min_similarity: 0.95,
            limit: 1,
            ..settings()
        },
    );

    let results = engine
        .query(
            "The lighthouse keeper polished the brass lens every evening.",
            None,
            &NoProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "stories/lighthouse.md");
}

#[tokio::test]
async fn test_progress_lifecycle() {
    let engine = engine(Arc::new(BagOfWordsModel::new()));
    let (reporter, mut rx) = ChannelProgress::new();

    let results = engine
        .query("brass lens", None, &reporter, &CancellationToken::new())
        .await
        .unwrap();
    drop(reporter);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&ProgressEvent::ReadingInputs));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::QueryingDone { results })
    );
    let querying = events
        .iter()
        .position(|e| *e == ProgressEvent::Querying)
        .unwrap();
    assert_eq!(querying, events.len() - 2);
    assert!(events[1..querying]
        .iter()
        .all(|e| matches!(e, ProgressEvent::Indexing { .. })));
    assert!(querying > 1);
}

#[tokio::test]
async fn test_provider_config_error_propagates_and_resets_progress() {
    let engine = engine(Arc::new(StubModel::new("stub/auth", Behavior::Auth)));
    let (reporter, mut rx) = ChannelProgress::new();

    let err = engine
        .query("anything", None, &reporter, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_provider_config());
    drop(reporter);

    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    assert_eq!(last, Some(ProgressEvent::Idle));
}

async fn drain(mut rx: UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_cancel_during_refresh_stops_query() {
    let cancel = CancellationToken::new();
    let model = Arc::new(StubModel::new(
        "stub/cancel",
        Behavior::CancelOnCall(1, cancel.clone()),
    ));
    let engine = engine(model.clone());
    let (reporter, rx) = ChannelProgress::new();

    let err = engine
        .query("anything", None, &reporter, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, QuillError::Cancelled), "got {:?}", err);
    drop(reporter);

    let events = drain(rx).await;
    assert_eq!(events.last(), Some(&ProgressEvent::Idle));
    assert!(!events.contains(&ProgressEvent::Querying));
}

#[tokio::test]
async fn test_query_cancelled_before_start_embeds_nothing() {
    let model = Arc::new(StubModel::normal());
    let engine = engine(model.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine
        .query("anything", None, &NoProgress, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, QuillError::Cancelled));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_reindex_all_through_engine() {
    let model = Arc::new(BagOfWordsModel::new());
    let engine = engine(model.clone());

    let first = engine
        .reindex(false, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.indexed_files, 3);

    let full = engine
        .reindex(true, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(full.indexed_files, 3);
    assert_eq!(model.calls(), 6);
}
