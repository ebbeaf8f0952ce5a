use chrono::{DateTime, Utc};
use ksql_core::{DataFrame, Error, Field, FieldValues, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Column parsed as a timestamp instead of a plain string
pub const DATETIME_COLUMN: &str = "DATETIME";

/// Name given to every frame built from a row
pub const FRAME_NAME: &str = "response";

/// First line of a push query response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHeader {
    #[serde(default)]
    pub query_id: Option<String>,
    pub column_names: Vec<String>,
    #[serde(default)]
    pub column_types: Vec<String>,
}

/// One result row, positionally matching the header columns
pub type Row = Vec<Value>;

pub fn decode_header(line: &str) -> Result<QueryHeader> {
    let value: Value = serde_json::from_str(line)?;
    if let Some(message) = server_error(&value) {
        return Err(Error::Connection(message));
    }
    serde_json::from_value(value).map_err(|e| Error::Decode(format!("invalid query header: {}", e)))
}

/// Decode a row line. Error objects emitted mid-stream become `Connection` errors.
pub fn decode_row(line: &str) -> Result<Row> {
    let value: Value = serde_json::from_str(line)?;
    match value {
        Value::Array(row) => Ok(row),
        other => match server_error(&other) {
            Some(message) => Err(Error::Connection(message)),
            None => Err(Error::Decode(format!("expected a row array, got: {}", other))),
        },
    }
}

fn server_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.contains_key("error_code") || obj.get("@type").and_then(|t| t.as_str()) == Some("generic_error") {
        let message = obj
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("ksqlDB reported an error");
        return Some(message.to_string());
    }
    None
}

/// Convert a row into a single-row frame, one field per column.
///
/// Nulls and nested values are skipped, as are `DATETIME` values that are
/// not RFC 3339.
pub fn row_to_frame(header: &QueryHeader, row: &Row) -> Result<DataFrame> {
    if row.len() != header.column_names.len() {
        return Err(Error::Decode(format!(
            "row has {} values but header has {} columns",
            row.len(),
            header.column_names.len()
        )));
    }

    let mut frame = DataFrame::new(FRAME_NAME);

    for (name, value) in header.column_names.iter().zip(row) {
        let values = match value {
            Value::String(s) if name == DATETIME_COLUMN => match parse_time(s) {
                Some(t) => FieldValues::Time(vec![t]),
                None => {
                    debug!("Skipping unparseable {} value '{}'", DATETIME_COLUMN, s);
                    continue;
                }
            },
            Value::String(s) => FieldValues::String(vec![s.clone()]),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValues::Int64(vec![i]),
                None => match n.as_f64() {
                    Some(f) => FieldValues::Float64(vec![f]),
                    None => continue,
                },
            },
            Value::Bool(b) => FieldValues::Bool(vec![*b]),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        frame.push_field(Field::new(name.clone(), values));
    }

    Ok(frame)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
