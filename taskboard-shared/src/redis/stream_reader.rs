/// Reads change events back from Redis Streams
///
/// Each [`ChangeTail`] holds its own connection, loops on `XREAD BLOCK`
/// and remembers the last id it saw.
///
/// A tail starts at the stream's newest entry at the time it is opened, so
/// every event published after [`ChangeReader::tail`] returns is delivered.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::events::Table;
/// use taskboard_shared::redis::client::{RedisClient, RedisConfig};
/// use taskboard_shared::redis::stream_reader::ChangeReader;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// let reader = ChangeReader::new(client);
///
/// let mut tail = reader.tail(Table::Tasks).await?;
/// loop {
///     for (stream_id, event) in tail.next_batch(5000).await? {
///         println!("{} {} on {}", stream_id, event.kind, event.table);
///     }
/// }
/// # }
/// ```

use crate::events::change::{ChangeEvent, Table};
use crate::events::serialization::{change_stream_key, deserialize_change};
use crate::redis::client::{RedisClient, RedisClientError};
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::HashMap;
use thiserror::Error;

/// Stream reader errors
#[derive(Error, Debug)]
pub enum StreamReaderError {
    /// Redis client error
    #[error("Redis error: {0}")]
    RedisError(#[from] RedisClientError),

    /// Raw Redis error
    #[error("Redis command error: {0}")]
    RedisCommandError(#[from] redis::RedisError),
}

/// Reader configuration
#[derive(Debug, Clone)]
pub struct StreamReaderConfig {
    /// Entries fetched per XREAD
    pub batch_size: usize,
}

impl Default for StreamReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
        }
    }
}

/// Reads [`ChangeEvent`]s from `changes:{table}`
#[derive(Clone)]
pub struct ChangeReader {
    client: RedisClient,
    config: StreamReaderConfig,
}

impl ChangeReader {
    pub fn new(client: RedisClient) -> Self {
        Self::with_config(client, StreamReaderConfig::default())
    }

    pub fn with_config(client: RedisClient, config: StreamReaderConfig) -> Self {
        Self { client, config }
    }

    /// Id of the newest entry, `None` for an empty or missing stream
    pub async fn latest_id(&self, table: Table) -> Result<Option<String>, StreamReaderError> {
        let stream_key = change_stream_key(table);
        let mut conn = self.client.get_connection();

        let reply: StreamRangeReply = conn.xrevrange_count(&stream_key, "+", "-", 1).await?;

        Ok(reply.ids.into_iter().next().map(|entry| entry.id))
    }

    /// Opens a live tail positioned after the current newest entry
    pub async fn tail(&self, table: Table) -> Result<ChangeTail, StreamReaderError> {
        let last_id = self
            .latest_id(table)
            .await?
            .unwrap_or_else(|| "0-0".to_string());
        let conn = self.client.dedicated_connection().await?;

        tracing::debug!(table = %table, last_id = %last_id, "Opened change tail");

        Ok(ChangeTail {
            conn,
            table,
            stream_key: change_stream_key(table),
            last_id,
            batch_size: self.config.batch_size,
        })
    }
}

/// Live position in one table's change stream
pub struct ChangeTail {
    conn: ConnectionManager,
    table: Table,
    stream_key: String,
    last_id: String,
    batch_size: usize,
}

impl ChangeTail {
    /// Blocks up to `timeout_ms` for new entries
    ///
    /// Returns an empty batch when the timeout expires.
    pub async fn next_batch(
        &mut self,
        timeout_ms: usize,
    ) -> Result<Vec<(String, ChangeEvent)>, StreamReaderError> {
        let opts = StreamReadOptions::default()
            .count(self.batch_size)
            .block(timeout_ms);

        let reply: StreamReadReply = self
            .conn
            .xread_options(&[&self.stream_key], &[&self.last_id], &opts)
            .await?;

        let events = decode_reply(self.table, reply);

        if let Some((stream_id, _)) = events.last() {
            self.last_id = stream_id.clone();
            tracing::trace!(
                table = %self.table,
                count = events.len(),
                last_id = %self.last_id,
                "Received live change events"
            );
        }

        Ok(events)
    }

    pub fn last_id(&self) -> &str {
        &self.last_id
    }
}

fn decode_reply(table: Table, reply: StreamReadReply) -> Vec<(String, ChangeEvent)> {
    reply
        .keys
        .into_iter()
        .flat_map(|key| key.ids)
        .filter_map(|entry| decode_entry(table, entry))
        .collect()
}

/// Undecodable entries are logged and skipped
fn decode_entry(table: Table, entry: StreamId) -> Option<(String, ChangeEvent)> {
    let fields: HashMap<String, String> = entry
        .map
        .iter()
        .filter_map(|(k, v)| {
            let value = redis::from_redis_value::<String>(v).ok()?;
            Some((k.clone(), value))
        })
        .collect();

    match deserialize_change(&fields) {
        Ok(event) => Some((entry.id, event)),
        Err(e) => {
            tracing::error!(
                table = %table,
                stream_id = %entry.id,
                error = %e,
                "Failed to deserialize change event, skipping"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::change::ChangeKind;
    use crate::redis::client::RedisConfig;
    use crate::redis::stream_writer::ChangeWriter;
    use serde_json::json;

    #[test]
    fn test_reader_config_default() {
        let config = StreamReaderConfig::default();
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_decode_entry_skips_garbage() {
        let mut map = HashMap::new();
        map.insert("table".to_string(), redis::Value::Data(b"tasks".to_vec()));
        let entry = StreamId {
            id: "1-0".to_string(),
            map,
        };
        assert!(decode_entry(Table::Tasks, entry).is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_tail_sees_events_published_after_open() {
        let client = RedisClient::new(RedisConfig::default_for_test()).await.unwrap();
        let writer = ChangeWriter::new(client.clone());
        let reader = ChangeReader::new(client);

        let mut tail = reader.tail(Table::Comments).await.unwrap();

        let event = ChangeEvent::new(
            Table::Comments,
            ChangeKind::Insert,
            json!({"task_id": "t1", "comment": "hello"}),
        );
        let stream_id = writer.publish(&event).await.unwrap();

        let batch = tail.next_batch(2000).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].1.record["comment"], "hello");
        assert_eq!(tail.last_id(), stream_id);
    }
}
