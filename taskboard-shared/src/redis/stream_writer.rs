/// Publishes change events to Redis Streams
///
/// ```text
/// PgStore mutation
///     │
///     │ publish()
///     ▼
/// ChangeWriter ── XADD changes:{table} ──> RedisChangeFeed tails
/// ```
///
/// XADD is retried with exponential backoff before giving up.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::events::{ChangeEvent, ChangeKind, Table};
/// use taskboard_shared::redis::client::{RedisClient, RedisConfig};
/// use taskboard_shared::redis::stream_writer::ChangeWriter;
/// use serde_json::json;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// let writer = ChangeWriter::new(client);
///
/// let event = ChangeEvent::new(Table::Tasks, ChangeKind::Insert, json!({"title": "Ship it"}));
/// let stream_id = writer.publish(&event).await?;
/// # Ok(())
/// # }
/// ```

use crate::events::change::ChangeEvent;
use crate::events::serialization::{change_stream_key, serialize_change, SerializationError};
use crate::redis::client::RedisClient;
use redis::AsyncCommands;
use std::collections::HashMap;
use thiserror::Error;

/// Stream writer errors
#[derive(Error, Debug)]
pub enum StreamWriterError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerializationError),

    /// Write failed after retries
    #[error("Failed to write event after {attempts} attempts: {last_error}")]
    WriteFailed { attempts: u32, last_error: String },
}

/// Retry behaviour for XADD
#[derive(Debug, Clone)]
pub struct StreamWriterConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,

    /// Approximate cap on entries kept per stream (`MAXLEN ~`)
    pub max_stream_len: usize,
}

impl Default for StreamWriterConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
            max_stream_len: 10_000,
        }
    }
}

impl StreamWriterConfig {
    /// Backoff before retry number `attempt` (1-based)
    pub fn retry_delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(16);
        std::cmp::min(
            self.base_retry_delay_ms.saturating_mul(2u64.pow(exp)),
            self.max_retry_delay_ms,
        )
    }
}

/// Writes [`ChangeEvent`]s to `changes:{table}`
#[derive(Clone)]
pub struct ChangeWriter {
    client: RedisClient,
    config: StreamWriterConfig,
}

impl ChangeWriter {
    pub fn new(client: RedisClient) -> Self {
        Self::with_config(client, StreamWriterConfig::default())
    }

    pub fn with_config(client: RedisClient, config: StreamWriterConfig) -> Self {
        Self { client, config }
    }

    /// Publishes an event and returns its stream entry id
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or XADD keeps failing after
    /// all retries.
    pub async fn publish(&self, event: &ChangeEvent) -> Result<String, StreamWriterError> {
        let fields = serialize_change(event)?;
        let stream_key = change_stream_key(event.table);

        let stream_id = self.xadd_with_retry(&stream_key, &fields).await?;

        tracing::debug!(
            table = %event.table,
            kind = %event.kind,
            stream_id = %stream_id,
            "Published change event"
        );

        Ok(stream_id)
    }

    async fn xadd_with_retry(
        &self,
        stream_key: &str,
        fields: &HashMap<String, String>,
    ) -> Result<String, StreamWriterError> {
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let max_len = redis::streams::StreamMaxlen::Approx(self.config.max_stream_len);

        let mut attempt = 0;
        loop {
            let mut conn = self.client.get_connection();

            match conn.xadd_maxlen(stream_key, max_len, "*", &items).await {
                Ok(stream_id) => return Ok(stream_id),
                Err(e) => {
                    attempt += 1;

                    if attempt > self.config.max_retries {
                        return Err(StreamWriterError::WriteFailed {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    let delay_ms = self.config.retry_delay_ms(attempt);
                    tracing::warn!(
                        stream_key = %stream_key,
                        attempt = attempt,
                        delay_ms = delay_ms,
                        error = %e,
                        "XADD failed, retrying"
                    );

                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::change::{ChangeKind, Table};
    use serde_json::json;

    #[test]
    fn test_stream_writer_config_default() {
        let config = StreamWriterConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_retry_delay_ms, 100);
        assert_eq!(config.max_retry_delay_ms, 5000);
        assert_eq!(config.max_stream_len, 10_000);
    }

    #[test]
    fn test_retry_delay_backoff() {
        let config = StreamWriterConfig::default();
        assert_eq!(config.retry_delay_ms(1), 100);
        assert_eq!(config.retry_delay_ms(2), 200);
        assert_eq!(config.retry_delay_ms(3), 400);
        assert_eq!(config.retry_delay_ms(10), 5000);
        assert_eq!(config.retry_delay_ms(u32::MAX), 5000);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_publish() {
        use crate::redis::client::RedisConfig;

        let client = RedisClient::new(RedisConfig::default_for_test()).await.unwrap();
        let writer = ChangeWriter::new(client);

        let event = ChangeEvent::new(Table::Tasks, ChangeKind::Insert, json!({"title": "t"}));
        let stream_id = writer.publish(&event).await.unwrap();
        assert!(stream_id.contains('-'));
    }
}
