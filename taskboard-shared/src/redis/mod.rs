/// Redis Streams transport for change events
///
/// # Architecture
///
/// ```text
/// ┌─────────────┐
/// │   PgStore   │ ──XADD──> changes:{table}
/// └─────────────┘
///                               │
///                               │ XREAD BLOCK (one tail per subscription)
///                               ▼
///                      ┌──────────────────┐
///                      │ RedisChangeFeed  │ ──> view subscriptions
///                      └──────────────────┘
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::redis::{ChangeReader, ChangeWriter, RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// let writer = ChangeWriter::new(client.clone());
/// let reader = ChangeReader::new(client);
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod stream_reader;
pub mod stream_writer;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use stream_reader::{ChangeReader, ChangeTail, StreamReaderConfig, StreamReaderError};
pub use stream_writer::{ChangeWriter, StreamWriterConfig, StreamWriterError};
