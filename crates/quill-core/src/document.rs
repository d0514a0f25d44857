//! Document store abstraction.
//!
//! The host application owns the documents; Quill only lists, reads, and
//! writes them through [`DocumentStore`]. [`InMemoryDocumentStore`] backs
//! tests and hosts that push content in directly.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::DocumentEntry;

/// Access to the host's document collection (a vault of markdown notes).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document with its modification time.
    async fn list_documents(&self) -> Result<Vec<DocumentEntry>>;

    /// Read a document's full text.
    async fn read(&self, path: &str) -> Result<String>;

    /// Replace a document's full text.
    async fn write(&self, path: &str, content: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredDocument {
    modified_time: i64,
    content: String,
}

/// In-memory document collection keyed by path.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<BTreeMap<String, StoredDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a document with an explicit modification time.
    pub fn put(&self, path: &str, modified_time: i64, content: &str) {
        self.docs.write().insert(
            path.to_string(),
            StoredDocument {
                modified_time,
                content: content.to_string(),
            },
        );
    }

    pub fn remove(&self, path: &str) -> bool {
        self.docs.write().remove(path).is_some()
    }

    pub fn modified_time(&self, path: &str) -> Option<i64> {
        self.docs.read().get(path).map(|d| d.modified_time)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        Ok(self
            .docs
            .read()
            .iter()
            .map(|(path, doc)| DocumentEntry {
                path: path.clone(),
                modified_time: doc.modified_time,
            })
            .collect())
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.docs
            .read()
            .get(path)
            .map(|d| d.content.clone())
            .ok_or_else(|| anyhow!("document not found: {}", path))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let mut docs = self.docs.write();
        let next_mtime = docs.get(path).map(|d| d.modified_time + 1).unwrap_or(1);
        docs.insert(
            path.to_string(),
            StoredDocument {
                modified_time: next_mtime,
                content: content.to_string(),
            },
        );
        Ok(())
    }
}
