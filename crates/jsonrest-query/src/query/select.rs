//! Select (projection) stage

use serde_json::Value;

use super::path::{pick, PropertyPath};
use super::Staged;

/// Select stage: project every record onto the given paths
///
/// No paths, or an empty list, passes records through unchanged and reports
/// `null`. Paths missing from a record are left out of its projection.
pub fn select_records(
    data: Vec<Value>,
    paths: Option<&[PropertyPath]>,
) -> Staged<Option<Vec<PropertyPath>>> {
    let paths = match paths {
        Some(paths) if !paths.is_empty() => paths,
        _ => return Staged::new(data, None),
    };

    let projected = data.iter().map(|record| pick(record, paths)).collect();
    Staged::new(projected, Some(paths.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(raw: &[&str]) -> Vec<PropertyPath> {
        raw.iter().map(|p| PropertyPath::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_no_paths_pass_through() {
        let data = vec![json!({ "a": 1, "b": 2 })];
        let staged = select_records(data.clone(), None);
        assert_eq!(staged.data, data);
        assert_eq!(staged.summary, None);
    }

    #[test]
    fn test_projects_nested_paths() {
        let data = vec![
            json!({ "id": 1, "address": { "city": "Oslo", "zip": "0150" }, "age": 40 }),
            json!({ "id": 2, "age": 22 }),
        ];
        let selected = paths(&["id", "address/city"]);
        let staged = select_records(data, Some(&selected));
        assert_eq!(
            staged.data,
            vec![json!({ "id": 1, "address": { "city": "Oslo" } }), json!({ "id": 2 })]
        );
        assert_eq!(
            serde_json::to_value(&staged.summary).unwrap(),
            json!(["id", "address/city"])
        );
    }

    #[test]
    fn test_missing_parent_is_omitted() {
        let data = vec![json!({ "x": 1 })];
        let staged = select_records(data, Some(&paths(&["a/b"])));
        assert_eq!(staged.data, vec![json!({})]);
    }
}
