use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column values of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    String(Vec<String>),
    Time(Vec<DateTime<Utc>>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::String(v) => v.len(),
            FieldValues::Time(v) => v.len(),
            FieldValues::Int64(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
            FieldValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Columnar batch of values sent on a live channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    pub name: String,
    pub fields: Vec<Field>,
}

impl DataFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One event of a query stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQueryResponse {
    /// Channel path the event came from
    pub key: String,

    #[serde(default)]
    pub data: Vec<DataFrame>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DataQueryResponse {
    pub fn frame(key: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            key: key.into(),
            data: vec![frame],
            error: None,
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_serialization() {
        let field = Field::new("COUNT", FieldValues::Int64(vec![3]));
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["name"], "COUNT");
        assert_eq!(value["type"], "int64");
        assert_eq!(value["values"][0], 3);
    }

    #[test]
    fn test_frame_lookup() {
        let mut frame = DataFrame::new("response");
        frame.push_field(Field::new("NAME", FieldValues::String(vec!["a".to_string()])));
        assert!(frame.field("NAME").is_some());
        assert!(frame.field("MISSING").is_none());
    }
}
