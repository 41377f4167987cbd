//! Client-local key/value store.
//!
//! The collection is serialized as one JSON array under a single key of a
//! string-to-string storage area. Nothing survives the process; the area can
//! be shared between stores to model several views over the same device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::subscription::{ChangeFeed, Subscription, spawn_snapshots};
use super::{IssueStore, not_found};
use crate::error::{Result, StoreError};
use crate::model::{Issue, IssueDraft};
use crate::query::IssueUpdate;
use crate::service::{apply_update, new_issue};
use crate::util::{generate_id, now};

/// Default key the collection is stored under.
pub const DEFAULT_LOCAL_KEY: &str = "school_issues";

/// String key/value area with change notification.
#[derive(Clone, Default)]
pub struct StorageArea {
    inner: Arc<AreaInner>,
}

#[derive(Default)]
struct AreaInner {
    items: Mutex<HashMap<String, String>>,
    feed: ChangeFeed,
}

impl StorageArea {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items().get(key).cloned()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items().insert(key.into(), value.into());
        self.inner.feed.publish();
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map; recover it.
        self.inner
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Store that keeps the collection in a [`StorageArea`].
#[derive(Clone)]
pub struct LocalStore {
    area: StorageArea,
    key: String,
}

impl LocalStore {
    /// Store over a fresh, private area.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_area(StorageArea::new(), key)
    }

    #[must_use]
    pub fn with_area(area: StorageArea, key: impl Into<String>) -> Self {
        Self {
            area,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn area(&self) -> &StorageArea {
        &self.area
    }

    fn decode(&self, raw: Option<&String>) -> Result<Vec<Issue>> {
        match raw {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| StoreError::unreadable(format!("local:{}", self.key), e)),
        }
    }

    /// Read-modify-write under the area lock.
    fn mutate<T>(&self, op: impl FnOnce(&mut Vec<Issue>) -> Result<T>) -> Result<T> {
        let out = {
            let mut items = self.area.items();
            let mut issues = self.decode(items.get(&self.key))?;
            let out = op(&mut issues)?;
            items.insert(self.key.clone(), serde_json::to_string(&issues)?);
            out
        };
        self.area.inner.feed.publish();
        Ok(out)
    }
}

#[async_trait]
impl IssueStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn list(&self) -> Result<Vec<Issue>> {
        let raw = self.area.get_item(&self.key);
        self.decode(raw.as_ref())
    }

    async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        let issue = self.mutate(|issues| {
            let created_at = now();
            let id = generate_id(&draft.title, &draft.description, created_at, |candidate| {
                issues.iter().any(|i| i.id == candidate)
            });
            let issue = new_issue(draft, id, created_at)?;
            issues.insert(0, issue.clone());
            Ok(issue)
        })?;
        info!(id = %issue.id, key = %self.key, "issue created");
        Ok(issue)
    }

    async fn update(&self, id: &str, update: &IssueUpdate) -> Result<Issue> {
        let updated = self.mutate(|issues| {
            let slot = issues
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| not_found(id))?;
            apply_update(slot, update, now())?;
            Ok(slot.clone())
        })?;
        debug!(id, status = %updated.status, "issue updated");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.mutate(|issues| {
            let index = issues
                .iter()
                .position(|i| i.id == id)
                .ok_or_else(|| not_found(id))?;
            issues.remove(index);
            Ok(())
        })?;
        info!(id, "issue deleted");
        Ok(())
    }

    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        Ok(spawn_snapshots(
            self.clone(),
            self.area.inner.feed.watch(),
            &cancel,
        ))
    }
}
