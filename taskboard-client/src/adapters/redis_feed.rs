/// Change feed over Redis Streams
///
/// Each subscription opens a [`ChangeTail`] on `changes:{table}` and spawns a
/// task that forwards matching events until the subscription closes or the
/// feed shuts down. The tail is positioned before `subscribe` returns, so
/// nothing published afterwards is missed.
///
/// # Example
///
/// ```no_run
/// use taskboard_client::adapters::RedisChangeFeed;
/// use taskboard_client::feed::ChangeFeed;
/// use taskboard_shared::events::{ChannelSpec, Table};
/// use taskboard_shared::redis::{ChangeReader, RedisClient, RedisConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// let feed = RedisChangeFeed::new(ChangeReader::new(client), CancellationToken::new());
///
/// let mut tasks = feed.subscribe(ChannelSpec::new(Table::Tasks)).await?;
/// while let Some(event) = tasks.recv().await {
///     println!("{} on {}", event.kind, event.table);
/// }
/// # Ok(())
/// # }
/// ```

use crate::error::StoreResult;
use crate::feed::{ChangeFeed, Subscription};
use async_trait::async_trait;
use taskboard_shared::events::{ChangeEvent, ChannelSpec};
use taskboard_shared::redis::{ChangeReader, ChangeTail};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// How long one XREAD blocks before re-checking cancellation
const DEFAULT_BLOCK_MS: usize = 5_000;

/// Pause after a failed read
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RedisChangeFeed {
    reader: ChangeReader,
    shutdown: CancellationToken,
    block_ms: usize,
}

impl RedisChangeFeed {
    /// Feed whose tails all stop when `shutdown` is cancelled
    pub fn new(reader: ChangeReader, shutdown: CancellationToken) -> Self {
        Self {
            reader,
            shutdown,
            block_ms: DEFAULT_BLOCK_MS,
        }
    }

    pub fn with_block_ms(mut self, block_ms: usize) -> Self {
        self.block_ms = block_ms;
        self
    }
}

#[async_trait]
impl ChangeFeed for RedisChangeFeed {
    async fn subscribe(&self, spec: ChannelSpec) -> StoreResult<Subscription> {
        let tail = self.reader.tail(spec.table).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.shutdown.child_token();

        tokio::spawn(forward(tail, spec.clone(), tx, token.clone(), self.block_ms));

        Ok(Subscription::new(&spec, rx, move || token.cancel()))
    }
}

async fn forward(
    mut tail: ChangeTail,
    spec: ChannelSpec,
    tx: mpsc::UnboundedSender<ChangeEvent>,
    token: CancellationToken,
    block_ms: usize,
) {
    let topic = spec.topic();
    tracing::debug!(topic = %topic, last_id = %tail.last_id(), "Change tail started");

    loop {
        let batch = tokio::select! {
            _ = token.cancelled() => break,
            batch = tail.next_batch(block_ms) => batch,
        };

        match batch {
            Ok(events) => {
                for (_, event) in events {
                    if spec.matches(&event) && tx.send(event).is_err() {
                        tracing::debug!(topic = %topic, "Subscriber gone, stopping tail");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Change tail read failed, retrying");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    tracing::debug!(topic = %topic, last_id = %tail.last_id(), "Change tail stopped");
}
