//! JSON snapshot source.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CandidateEntry;
use crate::sources::SourceAdapter;
use crate::utils::http::fetch_text;

/// Fetches a published catalog document over HTTP.
pub struct SnapshotSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl SnapshotSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for SnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<CandidateEntry>> {
        let text = fetch_text(&self.client, &self.url).await?;
        parse_snapshot(&self.name, &text)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a snapshot payload into candidates.
///
/// Accepts an array of entry objects, or a JSON string that itself holds
/// such an array. Ids in the payload are dropped.
pub fn parse_snapshot(source_name: &str, text: &str) -> Result<Vec<CandidateEntry>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| AppError::source_fetch(source_name, e))?;

    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|e| AppError::source_fetch(source_name, format!("embedded document: {e}")))?,
        other => other,
    };

    let Value::Array(items) = value else {
        return Err(AppError::source_shape(
            source_name,
            format!("expected an array of entries, got {}", value_kind(&value)),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value(item).map_err(|e| {
                AppError::source_shape(source_name, format!("entry #{idx}: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"[
        {"id": 1, "title": "Python", "category": "Programming", "content": "lang", "date": "2026-01-19"},
        {"id": 9, "title": "Go", "content": "", "date": "2026-01-20"}
    ]"#;

    #[test]
    fn test_parse_array() {
        let candidates = parse_snapshot("snapshot", DOC).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Python");
        assert_eq!(candidates[1].category, "General");
    }

    #[test]
    fn test_parse_string_wrapped_array() {
        let wrapped = serde_json::to_string(DOC).unwrap();
        let candidates = parse_snapshot("snapshot", &wrapped).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_object_is_shape_error() {
        let err = parse_snapshot("snapshot", r#"{"entries": []}"#).unwrap_err();
        assert!(matches!(err, AppError::SourceShape { .. }));
    }

    #[test]
    fn test_null_is_shape_error() {
        let err = parse_snapshot("snapshot", "null").unwrap_err();
        assert!(matches!(err, AppError::SourceShape { .. }));
    }

    #[test]
    fn test_unparseable_text_is_fetch_error() {
        let err = parse_snapshot("snapshot", "<html>404</html>").unwrap_err();
        assert!(matches!(err, AppError::SourceFetch { .. }));

        let err = parse_snapshot("snapshot", r#""not json inside""#).unwrap_err();
        assert!(matches!(err, AppError::SourceFetch { .. }));
    }

    #[test]
    fn test_malformed_entry_is_shape_error() {
        let err = parse_snapshot("snapshot", r#"[{"title": "No date"}]"#).unwrap_err();
        assert!(matches!(err, AppError::SourceShape { .. }));
    }
}
