//! Benchmark queries.

use serde::{Deserialize, Serialize};

/// A single GIS query in the benchmark battery.
///
/// Identity is `id`. Older query files name the text field `query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    /// Stable identifier, unique within a battery.
    pub id: String,

    /// Natural-language query text handed to the agent.
    #[serde(alias = "query")]
    pub text: String,
}

impl Query {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_accepts_legacy_field_name() {
        let q: Query =
            serde_json::from_str(r#"{"id": "q1", "query": "Flood risk near Dhaka?"}"#).unwrap();
        assert_eq!(q, Query::new("q1", "Flood risk near Dhaka?"));
    }

    #[test]
    fn test_query_requires_id() {
        let res: Result<Query, _> = serde_json::from_str(r#"{"text": "no id"}"#);
        assert!(res.is_err());
    }
}
