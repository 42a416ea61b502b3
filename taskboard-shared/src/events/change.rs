/// Row change notifications
///
/// A [`ChangeEvent`] says that a row in one of the `tasks`, `users` or
/// `comments` tables was inserted, updated or deleted. Subscribers describe
/// what they want with a [`ChannelSpec`]: a table, an optional column filter
/// in PostgREST syntax (`task_id=eq.<uuid>`), and an optional event kind.
///
/// # Example
///
/// ```
/// use taskboard_shared::events::change::{ChangeEvent, ChangeKind, ChannelSpec, ColumnFilter, Table};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = ChannelSpec::new(Table::Comments)
///     .filter(ColumnFilter::eq("task_id", 42))
///     .kind(ChangeKind::Insert);
///
/// let event = ChangeEvent::new(Table::Comments, ChangeKind::Insert, json!({"task_id": "42"}));
/// assert!(spec.matches(&event));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Error for unknown table or kind names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelParseError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown change kind: {0}")]
    UnknownKind(String),
}

/// Tables that publish change events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Tasks,
    Users,
    Comments,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Tasks => "tasks",
            Table::Users => "users",
            Table::Comments => "comments",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(Table::Tasks),
            "users" => Ok(Table::Users),
            "comments" => Ok(Table::Comments),
            other => Err(ChannelParseError::UnknownTable(other.to_string())),
        }
    }
}

/// Row operation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(ChangeKind::Insert),
            "UPDATE" => Ok(ChangeKind::Update),
            "DELETE" => Ok(ChangeKind::Delete),
            _ => Err(ChannelParseError::UnknownKind(s.to_string())),
        }
    }
}

/// One row change
///
/// `record` is the row after the change, or the removed row for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record: JsonValue,
    pub ts: DateTime<Utc>,
}

impl ChangeEvent {
    /// Event stamped with the current time
    pub fn new(table: Table, kind: ChangeKind, record: JsonValue) -> Self {
        Self {
            table,
            kind,
            record,
            ts: Utc::now(),
        }
    }

    /// Event for a serializable row
    pub fn for_row<T: Serialize>(
        table: Table,
        kind: ChangeKind,
        row: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(table, kind, serde_json::to_value(row)?))
    }

    /// Column value rendered the way filters compare it
    ///
    /// Strings compare raw, numbers and booleans by their JSON text; null or
    /// missing columns yield `None`.
    pub fn column(&self, name: &str) -> Option<String> {
        match self.record.get(name)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Equality filter on one column, written `column=eq.value`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

impl ColumnFilter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.column(&self.column).as_deref() == Some(self.value.as_str())
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// What a subscriber wants to hear about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSpec {
    pub table: Table,
    pub filter: Option<ColumnFilter>,
    pub kind: Option<ChangeKind>,
}

impl ChannelSpec {
    /// Every event on `table`
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filter: None,
            kind: None,
        }
    }

    pub fn filter(mut self, filter: ColumnFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table
            && self.kind.map_or(true, |kind| kind == event.kind)
            && self.filter.as_ref().map_or(true, |f| f.matches(event))
    }

    /// Human-readable channel name, e.g. `comments:task_id=eq.7:INSERT`
    pub fn topic(&self) -> String {
        let mut topic = self.table.to_string();
        if let Some(filter) = &self.filter {
            topic.push(':');
            topic.push_str(&filter.to_string());
        }
        if let Some(kind) = self.kind {
            topic.push(':');
            topic.push_str(kind.as_str());
        }
        topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment_event(task_id: &str, kind: ChangeKind) -> ChangeEvent {
        ChangeEvent::new(
            Table::Comments,
            kind,
            json!({"id": "c1", "task_id": task_id, "comment": "hi"}),
        )
    }

    #[test]
    fn test_filter_renders_eq_syntax() {
        let filter = ColumnFilter::eq("assigned_to", "ana@example.com");
        assert_eq!(filter.to_string(), "assigned_to=eq.ana@example.com");
        assert!(filter.matches(&ChangeEvent::new(
            Table::Tasks,
            ChangeKind::Update,
            json!({"assigned_to": "ana@example.com"}),
        )));
    }

    #[test]
    fn test_spec_matches_table_filter_and_kind() {
        let spec = ChannelSpec::new(Table::Comments)
            .filter(ColumnFilter::eq("task_id", "t1"))
            .kind(ChangeKind::Insert);

        assert!(spec.matches(&comment_event("t1", ChangeKind::Insert)));
        assert!(!spec.matches(&comment_event("t2", ChangeKind::Insert)));
        assert!(!spec.matches(&comment_event("t1", ChangeKind::Delete)));

        let task_event = ChangeEvent::new(Table::Tasks, ChangeKind::Insert, json!({"task_id": "t1"}));
        assert!(!spec.matches(&task_event));
    }

    #[test]
    fn test_unfiltered_spec_matches_everything_on_table() {
        let spec = ChannelSpec::new(Table::Tasks);
        for kind in [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete] {
            assert!(spec.matches(&ChangeEvent::new(Table::Tasks, kind, json!({}))));
        }
    }

    #[test]
    fn test_column_rendering() {
        let event = ChangeEvent::new(
            Table::Tasks,
            ChangeKind::Update,
            json!({"title": "x", "n": 3, "done": false, "due_date": null}),
        );
        assert_eq!(event.column("title").as_deref(), Some("x"));
        assert_eq!(event.column("n").as_deref(), Some("3"));
        assert_eq!(event.column("done").as_deref(), Some("false"));
        assert_eq!(event.column("due_date"), None);
        assert_eq!(event.column("missing"), None);
    }

    #[test]
    fn test_topic() {
        let spec = ChannelSpec::new(Table::Comments)
            .filter(ColumnFilter::eq("task_id", "7"))
            .kind(ChangeKind::Insert);
        assert_eq!(spec.topic(), "comments:task_id=eq.7:INSERT");
        assert_eq!(ChannelSpec::new(Table::Tasks).topic(), "tasks");
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("insert".parse::<ChangeKind>().unwrap(), ChangeKind::Insert);
        assert_eq!("DELETE".parse::<ChangeKind>().unwrap(), ChangeKind::Delete);
        assert!("upsert".parse::<ChangeKind>().is_err());
    }
}
