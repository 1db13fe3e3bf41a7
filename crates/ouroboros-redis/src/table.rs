//! Row and table model
//!
//! A [`Row`] is one timestamped observation with ordered named fields. A
//! [`Table`] is the ordered sequence of rows a producer keeps appending to and
//! publishes incrementally.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::StoreError;
use crate::timestamp::{self, TIMESTAMP_FIELD};

/// One observation: a UTC timestamp plus ordered data fields.
///
/// On the wire a row is a JSON object whose first member is `timestamp`,
/// followed by the data fields in insertion order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Row {
    timestamp: DateTime<Utc>,
    fields: Map<String, Value>,
}

impl Row {
    /// Create a row with no data fields
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fields: Map::new(),
        }
    }

    /// Builder form of [`Row::insert`].
    ///
    /// A `timestamp` value that cannot be coerced is ignored and the current
    /// timestamp is kept; use [`Row::insert`] to observe that failure.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.insert(name, value);
        self
    }

    /// Set a field, returning the previous value.
    ///
    /// Setting `timestamp` coerces the value and replaces the row timestamp.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, StoreError> {
        let name = name.into();
        let value = value.into();

        if name == TIMESTAMP_FIELD {
            let ts = timestamp::coerce(&value)?;
            let previous = timestamp::encode(&self.timestamp);
            self.timestamp = ts;
            return Ok(Some(previous));
        }

        Ok(self.fields.insert(name, value))
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// Data field by name. `timestamp` is not a data field; see [`Row::timestamp`].
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Data fields in insertion order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Number of fields including `timestamp`
    pub fn field_count(&self) -> usize {
        self.fields.len() + 1
    }

    /// Serialize to the JSON text stored in list entries
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self)
            .map_err(|e| StoreError::Encode(format!("Failed to serialize row: {}", e)))
    }

    /// Decode one stored list entry
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| StoreError::Decode(format!("Row entry is not valid JSON: {}", e)))?;
        match value {
            Value::Object(map) => Row::try_from(map),
            other => Err(StoreError::Decode(format!(
                "Row entry must be a JSON object, got: {}",
                other
            ))),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        map.serialize_entry(TIMESTAMP_FIELD, &timestamp::encode(&self.timestamp))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl TryFrom<Map<String, Value>> for Row {
    type Error = StoreError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut ts = None;
        let mut fields = Map::new();

        for (name, value) in map {
            if name == TIMESTAMP_FIELD {
                ts = Some(timestamp::coerce(&value)?);
            } else {
                fields.insert(name, value);
            }
        }

        let timestamp = ts.ok_or_else(|| {
            StoreError::Decode(format!("Row is missing the '{}' field", TIMESTAMP_FIELD))
        })?;

        Ok(Self { timestamp, fields })
    }
}

/// Ordered rows, indexed `0..len`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Index of the last row, `-1` when empty. This is the publication high-water mark.
    pub fn last_index(&self) -> i64 {
        self.rows.len() as i64 - 1
    }

    /// Rows after `last_published_index`, in order
    pub fn rows_after(&self, last_published_index: i64) -> &[Row] {
        let start = last_published_index.saturating_add(1).max(0) as usize;
        self.rows.get(start..).unwrap_or(&[])
    }

    /// Drop rows whose timestamp repeats (the last occurrence wins), then sort
    /// ascending by timestamp.
    pub fn into_timeline(self) -> Table {
        let mut last_seen: HashMap<DateTime<Utc>, usize> = HashMap::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            last_seen.insert(row.timestamp, index);
        }

        let mut rows: Vec<Row> = self
            .rows
            .into_iter()
            .enumerate()
            .filter(|(index, row)| last_seen.get(&row.timestamp) == Some(index))
            .map(|(_, row)| row)
            .collect();
        rows.sort_by_key(|row| row.timestamp);

        Table { rows }
    }
}

impl From<Vec<Row>> for Table {
    fn from(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Table {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_row_serializes_timestamp_first_then_field_order() {
        let row = Row::new(ts(0))
            .with_field("symbol", "SPY")
            .with_field("price", 451.25)
            .with_field("active", true);

        let encoded = row.to_json().unwrap();
        assert_eq!(
            encoded,
            r#"{"timestamp":"2023-11-14T22:13:20Z","symbol":"SPY","price":451.25,"active":true}"#
        );
    }

    #[test]
    fn test_row_decode_preserves_field_order_and_coerces_timestamp() {
        let raw = br#"{"zeta":1,"timestamp":1700000000000,"alpha":"a"}"#;
        let row = Row::from_json_slice(raw).unwrap();

        assert_eq!(row.timestamp(), ts(0));
        let names: Vec<&str> = row.fields().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(row.field_count(), 3);
    }

    #[test]
    fn test_row_decode_errors() {
        assert!(matches!(Row::from_json_slice(b"not json"), Err(StoreError::Decode(_))));
        assert!(matches!(Row::from_json_slice(b"[1,2]"), Err(StoreError::Decode(_))));
        assert!(matches!(
            Row::from_json_slice(br#"{"price":1.0}"#),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            Row::from_json_slice(br#"{"timestamp":"soon"}"#),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_row_insert_timestamp_field() {
        let mut row = Row::new(ts(0));
        let previous = row.insert("timestamp", "2023-11-14T22:13:30Z").unwrap();
        assert_eq!(previous, Some(json!("2023-11-14T22:13:20Z")));
        assert_eq!(row.timestamp(), ts(10));
        assert!(row.get("timestamp").is_none());

        assert!(row.insert("timestamp", json!({"bad": true})).is_err());
        assert_eq!(row.timestamp(), ts(10));
    }

    #[test]
    fn test_row_json_round_trip() {
        let row = Row::new(ts(5))
            .with_field("bid", 1.5)
            .with_field("tags", json!(["a", "b"]))
            .with_field("note", Value::Null);

        let decoded = Row::from_json_slice(row.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn test_rows_after_cursor() {
        let table: Table = (0..4).map(|i| Row::new(ts(i))).collect();

        assert_eq!(table.rows_after(-1).len(), 4);
        assert_eq!(table.rows_after(1).len(), 2);
        assert_eq!(table.rows_after(1)[0].timestamp(), ts(2));
        assert!(table.rows_after(3).is_empty());
        assert!(table.rows_after(10).is_empty());
        assert_eq!(table.last_index(), 3);
        assert_eq!(Table::new().last_index(), -1);
    }

    #[test]
    fn test_into_timeline_keeps_last_duplicate_and_sorts() {
        let table = Table::from(vec![
            Row::new(ts(3)).with_field("v", 1),
            Row::new(ts(1)).with_field("v", 2),
            Row::new(ts(3)).with_field("v", 3),
            Row::new(ts(2)).with_field("v", 4),
        ]);

        let timeline = table.into_timeline();
        let values: Vec<&Value> = timeline.iter().map(|r| r.get("v").unwrap()).collect();
        assert_eq!(values, vec![&json!(2), &json!(4), &json!(3)]);
    }
}
