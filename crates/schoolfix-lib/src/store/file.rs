//! JSON document store.
//!
//! The whole collection lives in one pretty-printed JSON array, newest
//! first. Writes go to a sibling temp file which is then renamed over the
//! original, so readers never observe a half-written document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::subscription::{ChangeFeed, Subscription, spawn_snapshots};
use super::{IssueStore, not_found};
use crate::error::{Result, StoreError};
use crate::model::{Issue, IssueDraft};
use crate::query::IssueUpdate;
use crate::service::{apply_update, new_issue};
use crate::util::{generate_id, now};

/// Default location of the collection document.
pub const DEFAULT_DATA_FILE: &str = "data/issues.json";

/// Load the collection from `path`.
///
/// A missing or blank file is an empty collection.
///
/// # Errors
///
/// Returns `Unreadable` if the file exists but cannot be read or is not a
/// JSON array of issues.
pub fn load(path: &Path) -> Result<Vec<Issue>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::unreadable(path.display().to_string(), e)),
    };
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents)
        .map_err(|e| StoreError::unreadable(path.display().to_string(), e))
}

/// Save the collection to `path` with an atomic write.
///
/// Creates the parent directory when it does not exist.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save(path: &Path, issues: &[Issue]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    let json = serde_json::to_string_pretty(issues)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Store backed by a single JSON document on disk.
#[derive(Clone)]
pub struct JsonFileStore {
    inner: Arc<FileInner>,
}

struct FileInner {
    path: PathBuf,
    write_lock: Mutex<()>,
    feed: ChangeFeed,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileInner {
                path: path.into(),
                write_lock: Mutex::new(()),
                feed: ChangeFeed::new(),
            }),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn read_all(&self) -> Result<Vec<Issue>> {
        let path = self.inner.path.clone();
        tokio::task::spawn_blocking(move || load(&path))
            .await
            .map_err(|e| StoreError::Backend(format!("file read task failed: {e}")))?
    }

    async fn write_all(&self, issues: Vec<Issue>) -> Result<()> {
        let path = self.inner.path.clone();
        tokio::task::spawn_blocking(move || save(&path, &issues))
            .await
            .map_err(|e| StoreError::Backend(format!("file write task failed: {e}")))??;
        self.inner.feed.publish();
        Ok(())
    }
}

#[async_trait]
impl IssueStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn list(&self) -> Result<Vec<Issue>> {
        self.read_all().await
    }

    async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        let _guard = self.inner.write_lock.lock().await;
        let mut issues = self.read_all().await?;

        let created_at = now();
        let id = generate_id(&draft.title, &draft.description, created_at, |candidate| {
            issues.iter().any(|i| i.id == candidate)
        });
        let issue = new_issue(draft, id, created_at)?;

        issues.insert(0, issue.clone());
        self.write_all(issues).await?;
        info!(id = %issue.id, path = %self.inner.path.display(), "issue created");
        Ok(issue)
    }

    async fn update(&self, id: &str, update: &IssueUpdate) -> Result<Issue> {
        let _guard = self.inner.write_lock.lock().await;
        let mut issues = self.read_all().await?;

        let slot = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found(id))?;
        apply_update(slot, update, now())?;
        let updated = slot.clone();

        self.write_all(issues).await?;
        debug!(id, status = %updated.status, "issue updated");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        let mut issues = self.read_all().await?;

        let index = issues
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| not_found(id))?;
        issues.remove(index);

        self.write_all(issues).await?;
        info!(id, "issue deleted");
        Ok(())
    }

    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        Ok(spawn_snapshots(
            self.clone(),
            self.inner.feed.watch(),
            &cancel,
        ))
    }
}
