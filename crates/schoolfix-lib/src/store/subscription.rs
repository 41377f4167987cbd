//! Change notification and snapshot subscriptions.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, watch};
use tokio_stream::Stream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::Issue;
use crate::store::IssueStore;

/// Snapshots buffered per subscriber before the producer waits.
const SUBSCRIPTION_BUFFER: usize = 16;

/// Revision counter bumped after every committed mutation.
///
/// Subscribers only learn *that* something changed; they re-read the full
/// collection, so bursts of writes coalesce into one snapshot.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: Arc<watch::Sender<u64>>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Record that the collection changed.
    pub fn publish(&self) {
        self.tx.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live view of a store: the current snapshot first, then one full
/// snapshot after each change.
///
/// Cancelling the token passed to `subscribe` (or calling [`cancel`](Self::cancel),
/// or dropping the subscription) stops the producer. Also usable as a
/// [`Stream`] of snapshots.
pub struct Subscription {
    rx: mpsc::Receiver<Result<Vec<Issue>>>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl Subscription {
    /// Next snapshot, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Vec<Issue>>> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = Result<Vec<Issue>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawn the producer task that feeds a subscription from `store`.
///
/// `cancel` is the caller's token; the subscription runs on a child of it so
/// dropping the subscription never cancels the caller's token.
pub(crate) fn spawn_snapshots<S>(
    store: S,
    mut revisions: watch::Receiver<u64>,
    cancel: &CancellationToken,
) -> Subscription
where
    S: IssueStore + 'static,
{
    let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
    let token = cancel.child_token();
    let task_token = token.clone();
    let backend = store.backend();

    tokio::spawn(async move {
        loop {
            let snapshot = store.list().await;
            if let Err(ref e) = snapshot {
                warn!(backend, error = %e, "subscription snapshot failed");
            }

            tokio::select! {
                () = task_token.cancelled() => break,
                sent = tx.send(snapshot) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }

            tokio::select! {
                () = task_token.cancelled() => break,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(backend, "subscription ended");
    });

    Subscription {
        rx,
        _guard: token.clone().drop_guard(),
        token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_bumps_revision() {
        let feed = ChangeFeed::new();
        let rx = feed.watch();
        assert_eq!(feed.revision(), 0);
        feed.publish();
        feed.publish();
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(feed.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_subscription_cancels_only_the_child() {
        let store = crate::store::LocalStore::new("k");
        let parent = CancellationToken::new();
        let mut sub = store.subscribe(parent.clone()).await.unwrap();
        assert!(sub.next().await.unwrap().unwrap().is_empty());
        assert!(!sub.is_cancelled());

        sub.cancel();
        assert!(sub.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscription_is_a_stream() {
        use tokio_stream::StreamExt;

        let store = crate::store::LocalStore::new("k");
        let sub = store.subscribe(CancellationToken::new()).await.unwrap();
        let first: Vec<usize> = sub
            .take(1)
            .map(|snapshot| snapshot.unwrap().len())
            .collect()
            .await;
        assert_eq!(first, vec![0]);
    }

    #[test]
    fn test_publish_without_receivers_does_not_panic() {
        let feed = ChangeFeed::default();
        feed.publish();
        assert_eq!(feed.revision(), 1);
    }
}
