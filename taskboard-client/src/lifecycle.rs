/// Mount/dispose bookkeeping shared by every view
///
/// A [`ViewLifecycle`] owns a view's subscriptions and its abort signal.
/// Fetches run through [`ViewLifecycle::guard`], which discards results that
/// arrive after the view was disposed or aborted.
///
/// # Example
///
/// ```
/// use taskboard_client::adapters::MemoryBackend;
/// use taskboard_client::feed::ChangeFeed;
/// use taskboard_client::lifecycle::ViewLifecycle;
/// use taskboard_shared::events::{ChannelSpec, Table};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let mut lifecycle = ViewLifecycle::new("board");
/// lifecycle.attach(backend.subscribe(ChannelSpec::new(Table::Tasks)).await?);
///
/// assert!(lifecycle.dispose());
/// assert!(!lifecycle.dispose());
/// assert_eq!(backend.open_channels(), 0);
/// # Ok(())
/// # }
/// ```

use crate::error::SyncError;
use crate::feed::Subscription;
use futures::future::select_all;
use std::future::Future;
use taskboard_shared::events::ChangeEvent;
use tokio_util::sync::CancellationToken;

pub struct ViewLifecycle {
    name: &'static str,
    token: CancellationToken,
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

impl ViewLifecycle {
    pub fn new(name: &'static str) -> Self {
        Self::with_token(name, CancellationToken::new())
    }

    /// Lifecycle aborted whenever `token` is cancelled
    pub fn with_token(name: &'static str, token: CancellationToken) -> Self {
        Self {
            name,
            token,
            subscriptions: Vec::new(),
            disposed: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Takes ownership of a subscription
    ///
    /// Attaching to a disposed view closes the subscription right away.
    pub fn attach(&mut self, mut subscription: Subscription) {
        if self.disposed {
            subscription.close();
            return;
        }
        tracing::debug!(view = self.name, topic = %subscription.topic(), "Subscribed");
        self.subscriptions.push(subscription);
    }

    /// Errors with `Disposed` once the view is gone
    pub fn ensure_live(&self) -> Result<(), SyncError> {
        if self.disposed || self.token.is_cancelled() {
            return Err(SyncError::Disposed);
        }
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Runs `fut` unless the view is disposed first
    ///
    /// A result that completes after cancellation is dropped.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, SyncError>
    where
        F: Future<Output = T>,
    {
        self.ensure_live()?;

        let output = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SyncError::Disposed),
            output = fut => output,
        };

        if self.token.is_cancelled() {
            tracing::debug!(view = self.name, "Discarding result of aborted fetch");
            return Err(SyncError::Disposed);
        }
        Ok(output)
    }

    /// Waits for the next event on any open subscription
    ///
    /// Returns `Ok(None)` when every subscription has ended.
    pub async fn next_event(&mut self) -> Result<Option<ChangeEvent>, SyncError> {
        self.ensure_live()?;

        loop {
            let pending: Vec<_> = self
                .subscriptions
                .iter_mut()
                .filter(|s| s.is_active())
                .map(|s| Box::pin(s.recv()))
                .collect();
            if pending.is_empty() {
                return Ok(None);
            }

            let token = &self.token;
            tokio::select! {
                _ = token.cancelled() => return Err(SyncError::Disposed),
                (event, _, _) = select_all(pending) => {
                    if let Some(event) = event {
                        return Ok(Some(event));
                    }
                }
            }
        }
    }

    /// Discards queued events, returning how many there were
    pub fn drain_pending(&mut self) -> usize {
        self.subscriptions.iter_mut().map(Subscription::drain).sum()
    }

    /// Number of subscriptions still open
    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions.iter().filter(|s| !s.is_closed()).count()
    }

    /// Token that aborts in-flight fetches when cancelled
    pub fn abort_signal(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Aborts in-flight fetches and closes every subscription
    ///
    /// Returns `true` the first time.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.token.cancel();

        let closed = self
            .subscriptions
            .iter_mut()
            .map(Subscription::close)
            .filter(|closed| *closed)
            .count();
        self.subscriptions.clear();

        tracing::debug!(view = self.name, closed, "Disposed view");
        true
    }
}

impl Drop for ViewLifecycle {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskboard_shared::events::{ChangeKind, ChannelSpec, Table};
    use tokio::sync::mpsc;

    fn subscription() -> (Subscription, mpsc::UnboundedSender<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Subscription::new(&ChannelSpec::new(Table::Tasks), rx, || {}), tx)
    }

    fn event(kind: ChangeKind) -> ChangeEvent {
        ChangeEvent::new(Table::Tasks, kind, json!({}))
    }

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let lifecycle = ViewLifecycle::new("test");
        let value = lifecycle.guard(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guard_after_abort_is_disposed() {
        let lifecycle = ViewLifecycle::new("test");
        lifecycle.abort_signal().cancel();

        let err = lifecycle.guard(async { 7 }).await.unwrap_err();
        assert!(err.is_disposed());
    }

    #[tokio::test]
    async fn test_guard_drops_late_result() {
        let lifecycle = ViewLifecycle::new("test");
        let signal = lifecycle.abort_signal();

        let err = lifecycle
            .guard(async move {
                signal.cancel();
                7
            })
            .await
            .unwrap_err();
        assert!(err.is_disposed());
    }

    #[tokio::test]
    async fn test_next_event_from_any_subscription() {
        let mut lifecycle = ViewLifecycle::new("test");
        let (first, _tx1) = subscription();
        let (second, tx2) = subscription();
        lifecycle.attach(first);
        lifecycle.attach(second);

        tx2.send(event(ChangeKind::Update)).unwrap();

        let received = lifecycle.next_event().await.unwrap().unwrap();
        assert_eq!(received.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn test_next_event_skips_ended_subscriptions() {
        let mut lifecycle = ViewLifecycle::new("test");
        let (ended, tx1) = subscription();
        let (live, tx2) = subscription();
        lifecycle.attach(ended);
        lifecycle.attach(live);

        drop(tx1);
        tx2.send(event(ChangeKind::Delete)).unwrap();

        let received = lifecycle.next_event().await.unwrap().unwrap();
        assert_eq!(received.kind, ChangeKind::Delete);

        drop(tx2);
        assert!(lifecycle.next_event().await.unwrap().is_none());
    }

    #[test]
    fn test_drain_pending_counts_all() {
        let mut lifecycle = ViewLifecycle::new("test");
        let (first, tx1) = subscription();
        let (second, tx2) = subscription();
        lifecycle.attach(first);
        lifecycle.attach(second);

        tx1.send(event(ChangeKind::Insert)).unwrap();
        tx1.send(event(ChangeKind::Update)).unwrap();
        tx2.send(event(ChangeKind::Insert)).unwrap();

        assert_eq!(lifecycle.drain_pending(), 3);
        assert_eq!(lifecycle.drain_pending(), 0);
    }

    #[tokio::test]
    async fn test_dispose_once() {
        let mut lifecycle = ViewLifecycle::new("test");
        let (sub, _tx) = subscription();
        lifecycle.attach(sub);
        assert_eq!(lifecycle.open_subscriptions(), 1);

        assert!(lifecycle.dispose());
        assert!(!lifecycle.dispose());
        assert_eq!(lifecycle.open_subscriptions(), 0);
        assert!(lifecycle.next_event().await.unwrap_err().is_disposed());
    }

    #[test]
    fn test_attach_after_dispose_closes() {
        let mut lifecycle = ViewLifecycle::new("test");
        lifecycle.dispose();

        let (sub, _tx) = subscription();
        lifecycle.attach(sub);
        assert_eq!(lifecycle.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_guard_runs_on_spawned_task() {
        let mut lifecycle = ViewLifecycle::new("test");
        let (sub, _tx) = subscription();
        lifecycle.attach(sub);
        let lifecycle = std::sync::Arc::new(lifecycle);

        let shared = lifecycle.clone();
        let value = tokio::spawn(async move { shared.guard(async { 7 }).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);
    }
}
