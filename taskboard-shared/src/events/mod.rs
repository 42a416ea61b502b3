/// Change events
///
/// - [`change`]: event, table, kind and subscription channel types
/// - [`serialization`]: Redis Stream encoding and stream keys
///
/// # Example
///
/// ```
/// use taskboard_shared::events::{change_stream_key, serialize_change, ChangeEvent, ChangeKind, Table};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let event = ChangeEvent::new(Table::Tasks, ChangeKind::Insert, json!({"title": "Ship it"}));
/// let fields = serialize_change(&event)?;
/// assert_eq!(change_stream_key(event.table), "changes:tasks");
/// assert_eq!(fields["kind"], "INSERT");
/// # Ok(())
/// # }
/// ```

pub mod change;
pub mod serialization;

pub use change::{ChangeEvent, ChangeKind, ChannelParseError, ChannelSpec, ColumnFilter, Table};
pub use serialization::{change_stream_key, deserialize_change, serialize_change, SerializationError};
