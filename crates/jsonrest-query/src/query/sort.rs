//! Sort stage

use std::cmp::Ordering;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::path::PropertyPath;
use super::value::total_order;
use super::Staged;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (default)
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Keyword as written in `orderby`
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort key: a property path and its direction
///
/// Serializes as a single-entry map, `{"address/city": "desc"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Property to sort by
    pub path: PropertyPath,
    /// Direction for this key
    pub direction: SortDirection,
}

impl SortKey {
    /// Create a sort key
    pub fn new(path: PropertyPath, direction: SortDirection) -> Self {
        Self { path, direction }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = total_order(self.path.resolve(a), self.path.resolve(b));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl Serialize for SortKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.path.as_str(), &self.direction)?;
        map.end()
    }
}

/// Sort stage: stable multi-key sort
///
/// Later keys are consulted only when every earlier key ties. Records that
/// tie on all keys keep their input order. No keys, or an empty list, leaves
/// the input untouched and reports `null`.
pub fn sort_records(mut data: Vec<Value>, keys: Option<&[SortKey]>) -> Staged<Option<Vec<SortKey>>> {
    let keys = match keys {
        Some(keys) if !keys.is_empty() => keys,
        _ => return Staged::new(data, None),
    };

    data.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    Staged::new(data, Some(keys.to_vec()))
}
