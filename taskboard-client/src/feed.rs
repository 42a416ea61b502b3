/// Change feed contract and subscriptions
///
/// A [`ChangeFeed`] opens one [`Subscription`] per [`ChannelSpec`]. Events
/// arrive on an unbounded channel owned by the subscription. Closing it runs
/// the adapter's release hook exactly once, whether through
/// [`Subscription::close`] or by dropping it.
///
/// # Example
///
/// ```
/// use taskboard_client::adapters::MemoryBackend;
/// use taskboard_client::feed::ChangeFeed;
/// use taskboard_shared::events::{ChannelSpec, Table};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let mut subscription = backend.subscribe(ChannelSpec::new(Table::Tasks)).await?;
/// assert_eq!(backend.open_channels(), 1);
///
/// assert!(subscription.close());
/// assert!(!subscription.close());
/// assert_eq!(backend.open_channels(), 0);
/// # Ok(())
/// # }
/// ```

use crate::error::StoreResult;
use async_trait::async_trait;
use taskboard_shared::events::{ChangeEvent, ChannelSpec};
use tokio::sync::mpsc;

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Starts delivering events that match `spec`
    ///
    /// Every matching event published after this returns is delivered.
    async fn subscribe(&self, spec: ChannelSpec) -> StoreResult<Subscription>;
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Live channel for one [`ChannelSpec`]
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    release: Option<Release>,
    ended: bool,
}

impl Subscription {
    /// Wraps a receiver; `release` runs when the subscription closes
    pub fn new<F>(spec: &ChannelSpec, rx: mpsc::UnboundedReceiver<ChangeEvent>, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            topic: spec.topic(),
            rx,
            release: Some(Box::new(release)),
            ended: false,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next event, or `None` once closed or when the feed has ended
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if !self.is_active() {
            return None;
        }
        let event = self.rx.recv().await;
        if event.is_none() {
            self.ended = true;
        }
        event
    }

    /// Next already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        if self.is_closed() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.ended = true;
                None
            }
        }
    }

    /// Discards everything already delivered and returns how many there were
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.try_recv().is_some() {
            count += 1;
        }
        count
    }

    /// Closes the channel
    ///
    /// Returns `true` the first time; later calls do nothing.
    pub fn close(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                self.rx.close();
                release();
                tracing::debug!(topic = %self.topic, "Closed subscription");
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.release.is_none()
    }

    /// Open and still fed
    pub fn is_active(&self) -> bool {
        !self.is_closed() && !self.ended
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("closed", &self.is_closed())
            .field("ended", &self.ended)
            .finish()
    }
}
