use serde::{Deserialize, Serialize};

/// Timeout applied to a new query, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A single user-authored ksqlDB query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Identifier of the query inside one request batch
    pub ref_id: String,

    /// The ksqlDB statement to run
    #[serde(default)]
    pub query_text: String,

    /// Seconds the push query stays open
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Query {
    pub fn new(ref_id: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_text: query_text.into(),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether this query may be executed at all.
    ///
    /// The text is not trimmed: a query consisting only of whitespace is
    /// still submitted.
    pub fn is_eligible(&self) -> bool {
        !self.query_text.is_empty()
    }

    /// Timeout used when running the query, falling back to the default
    pub fn effective_timeout(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Return a new query with one edit applied
    pub fn apply(&self, update: QueryUpdate) -> Self {
        let mut next = self.clone();
        match update {
            QueryUpdate::SetTimeout(timeout) => next.timeout = timeout,
            QueryUpdate::SetQueryText(text) => next.query_text = text,
        }
        next
    }
}

/// Edits made from the query editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryUpdate {
    SetTimeout(Option<u64>),
    SetQueryText(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_wire_names() {
        let query: Query = serde_json::from_value(json!({
            "refId": "A",
            "queryText": "SELECT * FROM PAGEVIEWS EMIT CHANGES;",
            "timeout": 30
        }))
        .unwrap();

        assert_eq!(query.ref_id, "A");
        assert_eq!(query.timeout, Some(30));

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["queryText"], "SELECT * FROM PAGEVIEWS EMIT CHANGES;");
    }

    #[test]
    fn test_missing_timeout_is_unset() {
        let query: Query = serde_json::from_value(json!({"refId": "B", "queryText": "x"})).unwrap();
        assert_eq!(query.timeout, None);
        assert_eq!(query.effective_timeout(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_eligibility_does_not_trim() {
        assert!(!Query::new("A", "").is_eligible());
        assert!(Query::new("A", " ").is_eligible());
        assert!(Query::new("A", "SHOW STREAMS;").is_eligible());
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let original = Query::new("A", "SHOW TOPICS;");
        let edited = original.apply(QueryUpdate::SetTimeout(Some(5)));

        assert_eq!(original.timeout, Some(DEFAULT_TIMEOUT_SECS));
        assert_eq!(edited.timeout, Some(5));
        assert_eq!(edited.query_text, original.query_text);

        let retyped = edited.apply(QueryUpdate::SetQueryText("SHOW STREAMS;".to_string()));
        assert_eq!(retyped.query_text, "SHOW STREAMS;");
        assert_eq!(edited.query_text, "SHOW TOPICS;");
    }
}
