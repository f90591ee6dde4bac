//! Slash-delimited property paths (`address/city`) over JSON records

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{QueryError, Result};

/// A parsed property path
///
/// Each `/` separates one level of nesting. Object levels are looked up by
/// key; array levels accept a base-10 index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a path, rejecting empty paths and empty segments (`a//b`)
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(QueryError::Parse("empty property path".into()));
        }

        let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(QueryError::Parse(format!(
                "empty segment in property path '{}'",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve this path against a record
    pub fn resolve<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        resolve_segments(record, &self.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Resolve a slash-delimited path against a record without parsing it first
///
/// Returns `None` for anything that does not resolve, including malformed
/// paths. This never fails.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let segments: Vec<&str> = path.split('/').collect();
    resolve_segments(record, &segments)
}

fn resolve_segments<'a, S: AsRef<str>>(record: &'a Value, segments: &[S]) -> Option<&'a Value> {
    let mut current = record;
    for segment in segments {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Build a new object holding only the given paths of `record`
///
/// Nested paths keep their nesting, and paths sharing a prefix share the
/// parent object. Paths that do not resolve are left out entirely.
pub fn pick(record: &Value, paths: &[PropertyPath]) -> Value {
    let mut picked = Map::new();
    for path in paths {
        if let Some(value) = path.resolve(record) {
            insert_at(&mut picked, path.segments(), value.clone());
        }
    }
    Value::Object(picked)
}

fn insert_at(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let child = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            // A non-object here is a whole value picked by a shorter path,
            // which already contains this one.
            if let Value::Object(map) = child {
                insert_at(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_path() {
        let path = PropertyPath::parse("address/city").unwrap();
        assert_eq!(path.segments(), ["address", "city"]);
        assert_eq!(path.to_string(), "address/city");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(PropertyPath::parse("").is_err());
        assert!(PropertyPath::parse("a//b").is_err());
        assert!(PropertyPath::parse("a/").is_err());
    }

    #[test]
    fn test_resolve_missing_is_absent() {
        let record = json!({ "a": { "b": 1 }, "s": "text" });
        assert_eq!(resolve(&record, "a/b"), Some(&json!(1)));
        assert_eq!(resolve(&record, "a/c"), None);
        assert_eq!(resolve(&record, "x/y/z"), None);
        assert_eq!(resolve(&record, "s/length"), None);
    }

    #[test]
    fn test_resolve_array_index() {
        let record = json!({ "tags": ["red", "blue"] });
        assert_eq!(resolve(&record, "tags/1"), Some(&json!("blue")));
        assert_eq!(resolve(&record, "tags/2"), None);
        assert_eq!(resolve(&record, "tags/first"), None);
    }

    #[test]
    fn test_pick_merges_shared_prefix() {
        let record = json!({ "a": { "b": 1, "c": 2, "d": 3 }, "e": 4 });
        let paths = vec![
            PropertyPath::parse("a/b").unwrap(),
            PropertyPath::parse("a/c").unwrap(),
        ];
        assert_eq!(pick(&record, &paths), json!({ "a": { "b": 1, "c": 2 } }));
    }

    #[test]
    fn test_pick_omits_unresolved() {
        let record = json!({ "name": "Amy" });
        let paths = vec![
            PropertyPath::parse("a/b").unwrap(),
            PropertyPath::parse("name").unwrap(),
        ];
        assert_eq!(pick(&record, &paths), json!({ "name": "Amy" }));
    }

    #[test]
    fn test_pick_whole_value_then_subpath() {
        let record = json!({ "a": { "b": 1, "c": 2 } });
        let paths = vec![
            PropertyPath::parse("a").unwrap(),
            PropertyPath::parse("a/b").unwrap(),
        ];
        assert_eq!(pick(&record, &paths), record);
    }
}
