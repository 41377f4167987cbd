//! Interchangeable issue stores.
//!
//! Every backend implements [`IssueStore`] with the same observable
//! semantics: newest-first lists from the file and local backends, key order
//! from the realtime backend, `IssueNotFound` for unknown ids, and
//! `Unreadable` (never an empty list) when the collection exists but cannot
//! be decoded.

pub mod file;
pub mod local;
pub mod realtime;
mod subscription;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};
use crate::model::{Issue, IssueDraft};
use crate::query::IssueUpdate;

pub use file::JsonFileStore;
pub use local::{LocalStore, StorageArea};
pub use realtime::{MemoryDatabase, RealtimeDatabase, RealtimeStore, RestDatabase};
pub use subscription::{ChangeFeed, Subscription};

/// Persistence contract shared by all backends.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Short backend name (`file`, `local`, `realtime`).
    fn backend(&self) -> &'static str;

    /// All issues in backend order.
    async fn list(&self) -> Result<Vec<Issue>>;

    /// One issue by id.
    async fn get(&self, id: &str) -> Result<Issue> {
        self.list()
            .await?
            .into_iter()
            .find(|issue| issue.id == id)
            .ok_or_else(|| StoreError::IssueNotFound { id: id.to_string() })
    }

    /// Validate a draft, assign identity and timestamps, and persist it.
    async fn create(&self, draft: IssueDraft) -> Result<Issue>;

    /// Merge `update` into the stored issue and return the new record.
    async fn update(&self, id: &str, update: &IssueUpdate) -> Result<Issue>;

    /// Remove the issue with `id`.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Live snapshots of the collection until `cancel` fires.
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription>;
}

fn not_found(id: &str) -> StoreError {
    StoreError::IssueNotFound { id: id.to_string() }
}
