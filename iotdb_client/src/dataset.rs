//! Query results as returned by a [`Session`](crate::session::Session)

use std::collections::VecDeque;

use observability_deps::tracing::debug;
use serde::Deserialize;

use crate::{Error, Result, SUCCESS_STATUS, Value};

/// One cell of a [`RowRecord`]; `None` when the store returned null
#[derive(Debug, Clone, PartialEq)]
pub struct Field(Option<Value>);

impl Field {
    pub fn new(value: Option<Value>) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Read the field as a 64-bit integer, the type the store uses for counts
    pub fn long_value(&self) -> Result<i64> {
        match &self.0 {
            Some(Value::Int64(v)) => Ok(*v),
            Some(Value::Int32(v)) => Ok(i64::from(*v)),
            Some(other) => Err(Error::FieldType {
                expected: "INT64",
                actual: other.data_type().to_string(),
            }),
            None => Err(Error::FieldType {
                expected: "INT64",
                actual: "null".to_string(),
            }),
        }
    }

    fn from_json(value: Option<&serde_json::Value>) -> Self {
        use serde_json::Value as Json;
        Self(match value {
            None | Some(Json::Null) => None,
            Some(Json::Bool(b)) => Some(Value::Boolean(*b)),
            Some(Json::Number(n)) => n
                .as_i64()
                .map(Value::Int64)
                .or_else(|| n.as_f64().map(Value::Double)),
            Some(Json::String(s)) => Some(Value::Text(s.clone())),
            Some(other) => Some(Value::Text(other.to_string())),
        })
    }
}

/// A single result row
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    timestamp: Option<i64>,
    fields: Vec<Field>,
}

impl RowRecord {
    pub fn new(timestamp: Option<i64>, fields: Vec<Field>) -> Self {
        Self { timestamp, fields }
    }

    /// The row's timestamp; aggregate results have none
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// The result set of one query statement
///
/// Rows are consumed front to back through the [`Iterator`] implementation.
#[derive(Debug, Clone, Default)]
pub struct SessionDataSet {
    column_names: Vec<String>,
    rows: VecDeque<RowRecord>,
}

impl SessionDataSet {
    pub fn new(column_names: Vec<String>, rows: impl IntoIterator<Item = RowRecord>) -> Self {
        Self {
            column_names,
            rows: rows.into_iter().collect(),
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn has_next(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Release the result set, discarding any rows not yet read
    pub fn close_operation_handle(self) {
        debug!(unread_rows = self.rows.len(), "closing query result set");
    }
}

impl Iterator for SessionDataSet {
    type Item = RowRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.pop_front()
    }
}

/// The body returned by the REST `query` API
///
/// Values are column-major: `values[c][r]` is column `c` of row `r`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    expressions: Option<Vec<String>>,
    #[serde(default)]
    column_names: Option<Vec<String>>,
    #[serde(default)]
    timestamps: Option<Vec<i64>>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    /// Decode a `query` body
    ///
    /// A failing statement still comes back with HTTP 200, as a status body (`code`, `message`)
    /// without any result keys; that is returned as [`Error::Server`].
    pub fn from_body(body: serde_json::Value) -> Result<Self> {
        let is_result = ["expressions", "column_names", "timestamps", "values"]
            .iter()
            .any(|key| body.get(key).is_some());
        if !is_result {
            if let Some(code) = body.get("code").and_then(serde_json::Value::as_i64) {
                if code != SUCCESS_STATUS {
                    return Err(Error::Server {
                        code,
                        message: body
                            .get("message")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
            }
        }
        serde_json::from_value(body).map_err(Error::QueryResult)
    }
}

impl From<QueryResponse> for SessionDataSet {
    fn from(resp: QueryResponse) -> Self {
        let QueryResponse {
            expressions,
            column_names,
            timestamps,
            values,
        } = resp;
        let names = column_names.or(expressions).unwrap_or_default();
        let timestamps = timestamps.unwrap_or_default();
        let row_count = values
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(timestamps.len());

        let rows = (0..row_count).map(|r| {
            RowRecord::new(
                timestamps.get(r).copied(),
                values.iter().map(|col| Field::from_json(col.get(r))).collect(),
            )
        });
        Self::new(names, rows.collect::<Vec<_>>())
    }
}
