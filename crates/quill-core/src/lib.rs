//! # Quill Core
//!
//! Shared, runtime-free logic for Quill: data models, markdown chunking,
//! the vector store abstraction, collaborator traits (embedding model,
//! document store, chat model), and the structured diff engine used to
//! review LLM-proposed edits.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP
//! dependencies. Everything that needs a runtime lives in the `quill`
//! app crate.

pub mod chat;
pub mod chunk;
pub mod diff;
pub mod document;
pub mod embedding;
pub mod models;
pub mod store;
