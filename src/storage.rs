//! Notebook storage collaborators.
//!
//! The core persists generated notebook sections through the [`Storage`]
//! trait and never depends on a backend's internal layout beyond the object
//! key scheme `users/{user_id}/notebooks/{notebook_id}/{relative_path}`.
//! [`LocalStorage`] is the filesystem backend used for development and tests;
//! a cloud-bucket implementation is a drop-in replacement.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Folder,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `content` and return the object key it was stored under.
    async fn upload(
        &self,
        user_id: &str,
        notebook_id: &str,
        relative_path: &str,
        content: &str,
        content_type: &str,
    ) -> Result<String>;

    async fn download(
        &self,
        user_id: &str,
        notebook_id: &str,
        relative_path: &str,
    ) -> Result<String>;

    /// List entries directly under `prefix` within a notebook, folders first.
    async fn list(
        &self,
        user_id: &str,
        notebook_id: &str,
        prefix: &str,
    ) -> Result<Vec<StorageEntry>>;
}

pub fn object_key(user_id: &str, notebook_id: &str, relative_path: &str) -> String {
    format!("users/{user_id}/notebooks/{notebook_id}/{relative_path}")
}

fn validate_ids(user_id: &str, notebook_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(anyhow!("user_id must not be empty"));
    }
    if notebook_id.trim().is_empty() {
        return Err(anyhow!("notebook_id must not be empty"));
    }
    Ok(())
}

/// Reject absolute paths and parent-directory traversal in object keys.
fn validate_relative_path(relative_path: &str) -> Result<()> {
    let path = Path::new(relative_path);
    if relative_path.trim().is_empty() {
        return Err(anyhow!("relative_path must not be empty"));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(anyhow!(
                    "relative_path '{}' must be a plain relative path",
                    relative_path
                ))
            }
        }
    }
    Ok(())
}

/// Filesystem-backed storage rooted at a configurable directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn notebook_dir(&self, user_id: &str, notebook_id: &str) -> PathBuf {
        self.root
            .join("users")
            .join(user_id)
            .join("notebooks")
            .join(notebook_id)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, content))]
    async fn upload(
        &self,
        user_id: &str,
        notebook_id: &str,
        relative_path: &str,
        content: &str,
        _content_type: &str,
    ) -> Result<String> {
        validate_ids(user_id, notebook_id)?;
        validate_relative_path(relative_path)?;

        let file_path = self.notebook_dir(user_id, notebook_id).join(relative_path);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        tokio::fs::write(&file_path, content)
            .await
            .with_context(|| format!("Failed to write {}", file_path.display()))?;

        let key = object_key(user_id, notebook_id, relative_path);
        debug!(key, bytes = content.len(), "Stored notebook section");
        Ok(key)
    }

    #[instrument(skip(self))]
    async fn download(
        &self,
        user_id: &str,
        notebook_id: &str,
        relative_path: &str,
    ) -> Result<String> {
        validate_ids(user_id, notebook_id)?;
        validate_relative_path(relative_path)?;

        let file_path = self.notebook_dir(user_id, notebook_id).join(relative_path);
        tokio::fs::read_to_string(&file_path).await.with_context(|| {
            format!(
                "File not found: {}",
                object_key(user_id, notebook_id, relative_path)
            )
        })
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        user_id: &str,
        notebook_id: &str,
        prefix: &str,
    ) -> Result<Vec<StorageEntry>> {
        validate_ids(user_id, notebook_id)?;

        let mut dir = self.notebook_dir(user_id, notebook_id);
        if !prefix.is_empty() {
            validate_relative_path(prefix)?;
            dir = dir.join(prefix);
        }

        let mut folders = BTreeSet::new();
        let mut files = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // Listing a notebook with nothing uploaded yet is not an error.
            Err(_) => return Ok(Vec::new()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix.trim_end_matches('/'), name)
            };
            let metadata = entry.metadata().await?;

            if metadata.is_dir() {
                folders.insert((name, relative));
            } else {
                let updated = metadata
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from);
                files.push(StorageEntry {
                    name,
                    path: relative,
                    kind: EntryKind::File,
                    size: Some(metadata.len()),
                    updated,
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));

        let mut result: Vec<StorageEntry> = folders
            .into_iter()
            .map(|(name, path)| StorageEntry {
                name,
                path,
                kind: EntryKind::Folder,
                size: None,
                updated: None,
            })
            .collect();
        result.extend(files);
        Ok(result)
    }
}

/// One generated notebook section awaiting persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookSection {
    pub relative_path: String,
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "text/markdown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionFailure {
    pub relative_path: String,
    pub error: String,
}

/// Outcome of persisting a batch of sections. `stored` and `failed` together
/// cover every input section; a failure never aborts the rest of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReport {
    pub stored: Vec<String>,
    pub failed: Vec<SectionFailure>,
}

impl SectionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct NotebookWriter {
    storage: std::sync::Arc<dyn Storage>,
}

impl NotebookWriter {
    pub fn new(storage: std::sync::Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist generated sections, continuing past individual upload failures
    /// and reporting partial success.
    #[instrument(skip(self, sections))]
    pub async fn persist_sections(
        &self,
        user_id: &str,
        notebook_id: &str,
        sections: &[NotebookSection],
    ) -> SectionReport {
        let mut report = SectionReport {
            stored: Vec::new(),
            failed: Vec::new(),
        };

        for section in sections {
            match self
                .storage
                .upload(
                    user_id,
                    notebook_id,
                    &section.relative_path,
                    &section.content,
                    &section.content_type,
                )
                .await
            {
                Ok(key) => report.stored.push(key),
                Err(e) => {
                    warn!(
                        path = %section.relative_path,
                        error = %e,
                        "Section generated but not persisted"
                    );
                    report.failed.push(SectionFailure {
                        relative_path: section.relative_path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
