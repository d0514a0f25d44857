//! Filesystem [`DocumentStore`]: a directory of markdown notes.
//!
//! Paths are vault-relative with `/` separators. Modification times are
//! milliseconds since the Unix epoch. Dot-directories (`.git`,
//! `.obsidian`, `.trash`) are never listed.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use quill_core::document::DocumentStore;
use quill_core::models::DocumentEntry;

use crate::config::VaultConfig;

/// A vault rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
    follow_symlinks: bool,
    extensions: Vec<String>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            extensions: vec!["md".to_string()],
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            ..Self::new(&config.root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a vault-relative path, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("path is not a plain vault-relative path: {}", path);
        }
        Ok(self.root.join(relative))
    }

    fn scan(&self) -> Result<Vec<DocumentEntry>> {
        if !self.root.exists() {
            bail!("Vault root does not exist: {}", self.root.display());
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let has_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
            if !has_extension {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            entries.push(DocumentEntry {
                path: rel_str,
                modified_time: modified_millis(path)?,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn modified_millis(path: &Path) -> Result<i64> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    Ok(modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64)
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.scan()).await?
    }

    async fn read(&self, path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("Failed to read {}", full.display()))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Failed to write {}", full.display()))
    }
}
