//! # Quill
//!
//! Retrieval and editing core for an LLM-assisted note-taking workflow.
//!
//! Quill keeps a vector index of a vault of markdown notes fresh
//! incrementally, answers semantic queries over it, and turns an
//! LLM-proposed rewrite of a note into a reviewable structured diff.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ DocumentStore│──▶│   Indexer    │──▶│  VectorStore  │
//! │ (vault)      │   │ chunk+embed │   │ SQLite/memory │
//! └──────┬───────┘   └──────▲──────┘   └───────┬───────┘
//!        │                  │                  │
//!        │           ┌──────┴──────────────────▼──┐
//!        │           │         RagEngine          │
//!        │           │  refresh → embed → search  │
//!        │           └────────────────────────────┘
//!        ▼
//! ┌──────────────┐   ┌─────────────┐
//! │  ChatModel   │──▶│ DiffReview  │── accept/reject ──▶ write back
//! └──────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`indexer`] | Incremental chunk/embed/store pipeline |
//! | [`rag`] | Query engine with index refresh |
//! | [`apply`] | LLM edit request → diff review → write back |
//! | [`embedding`] | OpenAI-compatible embedding model |
//! | [`retry`] | Exponential backoff with full jitter |
//! | [`progress`] | Progress events and reporters |
//! | [`sqlite_store`] | SQLite-backed vector store |
//! | [`vault`] | Filesystem document store |
//! | [`db`] / [`migrate`] | Database connection and schema |

pub mod apply;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod migrate;
pub mod progress;
pub mod rag;
pub mod retry;
pub mod sqlite_store;
pub mod vault;

pub use error::{QuillError, QuillResult};
pub use quill_core;
