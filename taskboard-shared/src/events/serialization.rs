/// Change event serialization for Redis Streams
///
/// Redis Stream entries are flat field-value string pairs, so a
/// [`ChangeEvent`] is written as:
///
/// ```text
/// table:  "tasks"
/// kind:   "UPDATE"
/// record: "{\"id\":\"...\",\"status\":\"Done\"}"
/// ts:     "2025-01-03T12:00:00+00:00"
/// ```
///
/// # Stream Naming
///
/// One stream per table: `changes:{table}`.

use crate::events::change::{ChangeEvent, ChangeKind, Table};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid field value
    #[error("Invalid field value for {field}: {error}")]
    InvalidValue { field: String, error: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Timestamp parsing error
    #[error("Timestamp error: {0}")]
    TimestampError(String),
}

/// Converts a change event into XADD field-value pairs
pub fn serialize_change(event: &ChangeEvent) -> Result<HashMap<String, String>, SerializationError> {
    let mut fields = HashMap::new();

    fields.insert("table".to_string(), event.table.to_string());
    fields.insert("kind".to_string(), event.kind.to_string());
    fields.insert("record".to_string(), serde_json::to_string(&event.record)?);
    fields.insert("ts".to_string(), event.ts.to_rfc3339());

    Ok(fields)
}

/// Rebuilds a change event from a stream entry
///
/// # Errors
///
/// Returns an error if a field is missing or malformed
pub fn deserialize_change(fields: &HashMap<String, String>) -> Result<ChangeEvent, SerializationError> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| SerializationError::MissingField(name.to_string()))
    };

    let table = field("table")?
        .parse::<Table>()
        .map_err(|e| SerializationError::InvalidValue {
            field: "table".to_string(),
            error: e.to_string(),
        })?;

    let kind = field("kind")?
        .parse::<ChangeKind>()
        .map_err(|e| SerializationError::InvalidValue {
            field: "kind".to_string(),
            error: e.to_string(),
        })?;

    let record: JsonValue = serde_json::from_str(field("record")?)?;

    let ts = DateTime::parse_from_rfc3339(field("ts")?)
        .map_err(|e| SerializationError::TimestampError(e.to_string()))?
        .with_timezone(&Utc);

    Ok(ChangeEvent {
        table,
        kind,
        record,
        ts,
    })
}

/// Redis Stream key for a table's changes
///
/// ```
/// use taskboard_shared::events::change::Table;
/// use taskboard_shared::events::serialization::change_stream_key;
///
/// assert_eq!(change_stream_key(Table::Comments), "changes:comments");
/// ```
pub fn change_stream_key(table: Table) -> String {
    format!("changes:{}", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_event() -> ChangeEvent {
        ChangeEvent {
            table: Table::Tasks,
            kind: ChangeKind::Update,
            record: json!({"id": "550e8400-e29b-41d4-a716-446655440000", "status": "Done"}),
            ts: DateTime::parse_from_rfc3339("2025-01-03T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn valid_fields() -> HashMap<String, String> {
        serialize_change(&create_test_event()).unwrap()
    }

    #[test]
    fn test_serialize_change() {
        let fields = valid_fields();

        assert_eq!(fields.get("table").unwrap(), "tasks");
        assert_eq!(fields.get("kind").unwrap(), "UPDATE");
        assert_eq!(fields.get("ts").unwrap(), "2025-01-03T12:00:00+00:00");
        assert!(fields.get("record").unwrap().contains("\"status\":\"Done\""));
    }

    #[test]
    fn test_deserialize_change() {
        let event = create_test_event();
        let roundtrip = deserialize_change(&valid_fields()).unwrap();
        assert_eq!(roundtrip, event);
    }

    #[test]
    fn test_deserialize_missing_field() {
        let mut fields = valid_fields();
        fields.remove("record");

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::MissingField(f)) if f == "record"
        ));
    }

    #[test]
    fn test_deserialize_unknown_table() {
        let mut fields = valid_fields();
        fields.insert("table".to_string(), "projects".to_string());

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deserialize_invalid_json() {
        let mut fields = valid_fields();
        fields.insert("record".to_string(), "{invalid json}".to_string());

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::JsonError(_))
        ));
    }

    #[test]
    fn test_deserialize_invalid_timestamp() {
        let mut fields = valid_fields();
        fields.insert("ts".to_string(), "yesterday".to_string());

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::TimestampError(_))
        ));
    }

    #[test]
    fn test_stream_keys() {
        assert_eq!(change_stream_key(Table::Tasks), "changes:tasks");
        assert_eq!(change_stream_key(Table::Users), "changes:users");
        assert_eq!(change_stream_key(Table::Comments), "changes:comments");
    }
}
