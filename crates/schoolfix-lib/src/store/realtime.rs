//! Hosted realtime-database store.
//!
//! Issues live as children of a root node, keyed by database-generated push
//! keys. The push key is a storage detail: callers address issues by their
//! `id` field like every other backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::subscription::{ChangeFeed, Subscription, spawn_snapshots};
use super::{IssueStore, not_found};
use crate::error::{Result, StoreError};
use crate::model::{Issue, IssueDraft};
use crate::query::IssueUpdate;
use crate::service::{apply_update, new_issue};
use crate::util::{generate_id, now};

/// Default root node for the collection.
pub const DEFAULT_ROOT: &str = "issues";

/// Default interval between remote change polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional record fields. Absent values are written as `null` so a merge
/// removes them remotely.
const OPTIONAL_FIELDS: [&str; 6] = [
    "reporterName",
    "reporterContact",
    "location",
    "imageUrl",
    "resolvedAt",
    "adminNote",
];

/// Minimal hierarchical JSON database: the primitives the store needs.
#[async_trait]
pub trait RealtimeDatabase: Send + Sync {
    /// Value at `path`, `Null` when nothing is there.
    async fn get(&self, path: &str) -> Result<Value>;

    /// Append `value` under `path` with a generated, time-ordered key.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Merge `fields` into the node at `path`; `null` fields are removed.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Delete the node at `path`.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Revision counter bumped whenever data under `path` changes.
    fn watch(&self, path: &str) -> watch::Receiver<u64>;
}

// ============================================================================
// Store
// ============================================================================

/// Store over a [`RealtimeDatabase`].
#[derive(Clone)]
pub struct RealtimeStore {
    db: Arc<dyn RealtimeDatabase>,
    root: String,
}

impl RealtimeStore {
    #[must_use]
    pub fn new(db: Arc<dyn RealtimeDatabase>, root: impl Into<String>) -> Self {
        Self {
            db,
            root: normalize_path(&root.into()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn child(&self, key: &str) -> String {
        format!("{}/{key}", self.root)
    }

    async fn entries(&self) -> Result<Vec<(String, Issue)>> {
        let value = self.db.get(&self.root).await?;
        decode_entries(&self.root, value)
    }

    async fn find(&self, id: &str) -> Result<(String, Issue)> {
        self.entries()
            .await?
            .into_iter()
            .find(|(_, issue)| issue.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn decode_entries(root: &str, value: Value) -> Result<Vec<(String, Issue)>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(children) => {
            let mut entries = Vec::with_capacity(children.len());
            for (key, child) in children {
                let issue: Issue = serde_json::from_value(child).map_err(|e| {
                    StoreError::unreadable(format!("realtime:{root}/{key}"), e)
                })?;
                entries.push((key, issue));
            }
            Ok(entries)
        }
        other => Err(StoreError::unreadable(
            format!("realtime:{root}"),
            format!("expected an object of issues, found {}", json_kind(&other)),
        )),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Full record as merge fields, with explicit nulls for absent optionals.
fn record_fields(issue: &Issue) -> Result<Map<String, Value>> {
    let Value::Object(mut fields) = serde_json::to_value(issue)? else {
        return Err(StoreError::Backend(
            "issue did not serialize to an object".to_string(),
        ));
    };
    for key in OPTIONAL_FIELDS {
        fields.entry(key).or_insert(Value::Null);
    }
    Ok(fields)
}

#[async_trait]
impl IssueStore for RealtimeStore {
    fn backend(&self) -> &'static str {
        "realtime"
    }

    async fn list(&self) -> Result<Vec<Issue>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|(_, issue)| issue)
            .collect())
    }

    async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        let existing = self.entries().await?;
        let created_at = now();
        let id = generate_id(&draft.title, &draft.description, created_at, |candidate| {
            existing.iter().any(|(_, i)| i.id == candidate)
        });
        let issue = new_issue(draft, id, created_at)?;

        let key = self
            .db
            .push(&self.root, serde_json::to_value(&issue)?)
            .await?;
        info!(id = %issue.id, key = %key, "issue created");
        Ok(issue)
    }

    async fn update(&self, id: &str, update: &IssueUpdate) -> Result<Issue> {
        let (key, mut issue) = self.find(id).await?;
        apply_update(&mut issue, update, now())?;
        self.db.update(&self.child(&key), record_fields(&issue)?).await?;
        debug!(id, key = %key, status = %issue.status, "issue updated");
        Ok(issue)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (key, _) = self.find(id).await?;
        self.db.remove(&self.child(&key)).await?;
        info!(id, key = %key, "issue deleted");
        Ok(())
    }

    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        Ok(spawn_snapshots(
            self.clone(),
            self.db.watch(&self.root),
            &cancel,
        ))
    }
}

// ============================================================================
// Path helpers
// ============================================================================

fn normalize_path(path: &str) -> String {
    segments(path).join("/")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn lookup<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(node, |node, segment| node.get(*segment))
}

fn set_at(node: &mut Value, path: &[&str], value: Value) {
    match path.split_first() {
        None => *node = value,
        Some((head, rest)) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(children) = node {
                set_at(children.entry(*head).or_insert(Value::Null), rest, value);
            }
        }
    }
}

fn remove_at(node: &mut Value, path: &[&str]) {
    match path {
        [] => *node = Value::Null,
        [leaf] => {
            if let Value::Object(children) = node {
                children.remove(*leaf);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = node.get_mut(*head) {
                remove_at(child, rest);
            }
        }
    }
}

/// True when a write at `written` can change what a watcher of `watched` sees.
fn overlaps(watched: &str, written: &str) -> bool {
    let watched = segments(watched);
    let written = segments(written);
    watched.iter().zip(written.iter()).all(|(a, b)| a == b)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ============================================================================
// In-process database
// ============================================================================

/// In-process [`RealtimeDatabase`], used for development and tests.
#[derive(Default)]
pub struct MemoryDatabase {
    tree: Mutex<Value>,
    feed: ChangeFeed,
    next_key: AtomicU64,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the node at `path`, bypassing the store.
    pub fn seed(&self, path: &str, value: Value) {
        set_at(&mut lock(&self.tree), &segments(path), value);
        self.feed.publish();
    }

    fn push_key(&self) -> String {
        let seq = self.next_key.fetch_add(1, Ordering::Relaxed);
        format!("-{:013}{seq:07}", Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl RealtimeDatabase for MemoryDatabase {
    async fn get(&self, path: &str) -> Result<Value> {
        let tree = lock(&self.tree);
        Ok(lookup(&tree, &segments(path)).cloned().unwrap_or(Value::Null))
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let key = self.push_key();
        {
            let mut target = segments(path);
            target.push(&key);
            set_at(&mut lock(&self.tree), &target, value);
        }
        self.feed.publish();
        Ok(key)
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        {
            let mut tree = lock(&self.tree);
            let base = segments(path);
            for (field, value) in fields {
                let mut target = base.clone();
                target.extend(segments(&field));
                if value.is_null() {
                    remove_at(&mut tree, &target);
                } else {
                    set_at(&mut tree, &target, value);
                }
            }
        }
        self.feed.publish();
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        remove_at(&mut lock(&self.tree), &segments(path));
        self.feed.publish();
        Ok(())
    }

    fn watch(&self, _path: &str) -> watch::Receiver<u64> {
        self.feed.watch()
    }
}

// ============================================================================
// REST client
// ============================================================================

/// [`RealtimeDatabase`] over the Firebase-style REST protocol:
/// `GET|POST|PATCH|DELETE {base}/{path}.json?auth={token}`.
///
/// Remote changes are detected by polling each watched path.
#[derive(Clone)]
pub struct RestDatabase {
    inner: Arc<RestInner>,
}

struct RestInner {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
    poll_interval: Duration,
    watchers: Mutex<HashMap<String, ChangeFeed>>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestDatabase {
    /// Build a client for the database at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a non-http(s) URL or a zero poll interval, and
    /// `Backend` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<String>,
        poll_interval: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::Config(format!(
                "realtime URL must be http(s): '{base_url}'"
            )));
        }
        if poll_interval.is_zero() {
            return Err(StoreError::Config(
                "realtime poll interval must be positive".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            inner: Arc::new(RestInner {
                client,
                base_url,
                auth: auth.filter(|a| !a.is_empty()),
                poll_interval,
                watchers: Mutex::new(HashMap::new()),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.inner.base_url, normalize_path(path))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, self.url(path));
        match self.inner.auth {
            Some(ref auth) => builder.query(&[("auth", auth)]),
            None => builder,
        }
    }

    /// Wake watchers whose subtree a local write touched.
    fn notify(&self, written: &str) {
        for (watched, feed) in lock(&self.inner.watchers).iter() {
            if overlaps(watched, written) {
                feed.publish();
            }
        }
    }

    /// Drop the watcher for `path` once nobody listens. Returns true if dropped.
    fn release_if_unwatched(&self, path: &str, feed: &ChangeFeed) -> bool {
        let mut watchers = lock(&self.inner.watchers);
        if feed.receiver_count() == 0 {
            watchers.remove(path);
            true
        } else {
            false
        }
    }

    async fn poll_changes(self, path: String, feed: ChangeFeed) {
        let mut ticker = tokio::time::interval(self.inner.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Value> = None;

        loop {
            ticker.tick().await;
            if self.release_if_unwatched(&path, &feed) {
                break;
            }
            match self.get(&path).await {
                Ok(value) => {
                    if last.as_ref().is_some_and(|prev| prev != &value) {
                        debug!(path = %path, "remote change detected");
                        feed.publish();
                    }
                    last = Some(value);
                }
                Err(e) => warn!(path = %path, error = %e, "realtime poll failed"),
            }
        }
        debug!(path = %path, "realtime poller stopped");
    }
}

#[async_trait]
impl RealtimeDatabase for RestDatabase {
    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let response = self
            .request(Method::POST, path)
            .json(&value)
            .send()
            .await?
            .error_for_status()?;
        let PushResponse { name } = response.json().await?;
        self.notify(path);
        Ok(name)
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        self.request(Method::PATCH, path)
            .json(&fields)
            .send()
            .await?
            .error_for_status()?;
        self.notify(path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path)
            .send()
            .await?
            .error_for_status()?;
        self.notify(path);
        Ok(())
    }

    fn watch(&self, path: &str) -> watch::Receiver<u64> {
        let path = normalize_path(path);
        let mut watchers = lock(&self.inner.watchers);
        if let Some(feed) = watchers.get(&path) {
            return feed.watch();
        }

        let feed = ChangeFeed::new();
        let rx = feed.watch();
        watchers.insert(path.clone(), feed.clone());
        drop(watchers);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.clone().poll_changes(path, feed));
            }
            Err(_) => warn!(path = %path, "no async runtime, remote changes will not be observed"),
        }
        rx
    }
}
