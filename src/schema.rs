//! JSON Schema inference from a sample collection
//!
//! Produces a draft-04 document describing an array of records. Object
//! properties are merged across every sample; a property is `required` only
//! if every object sample has it.

use serde_json::{json, Map, Value};

/// Schema dialect emitted by [`infer_schema`]
pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-04/schema#";

/// Infer a schema for `sample`, an array of records
///
/// The array schema is titled `"{title} Set"` and its items `title`.
pub fn infer_schema(title: &str, sample: &[Value]) -> Value {
    let mut items = Shape::default();
    for value in sample {
        items.observe(value);
    }

    let mut item_schema = items.to_schema();
    if let Value::Object(map) = &mut item_schema {
        map.insert("title".into(), Value::String(title.to_string()));
    }

    json!({
        "$schema": SCHEMA_DRAFT,
        "title": format!("{} Set", title),
        "type": "array",
        "items": item_schema,
    })
}

/// Accumulated shape of every value seen at one position
#[derive(Debug, Default)]
struct Shape {
    /// JSON Schema type names, first seen first
    kinds: Vec<&'static str>,
    /// Object properties, first seen first, with how many objects had them
    properties: Vec<(String, usize, Shape)>,
    objects: usize,
    items: Option<Box<Shape>>,
}

impl Shape {
    fn observe(&mut self, value: &Value) {
        let kind = kind_of(value);
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }

        match value {
            Value::Object(map) => {
                self.objects += 1;
                for (key, child) in map {
                    match self.properties.iter_mut().find(|(name, _, _)| name == key) {
                        Some((_, seen, shape)) => {
                            *seen += 1;
                            shape.observe(child);
                        }
                        None => {
                            let mut shape = Shape::default();
                            shape.observe(child);
                            self.properties.push((key.clone(), 1, shape));
                        }
                    }
                }
            }
            Value::Array(elements) => {
                let items = self.items.get_or_insert_with(Box::default);
                for element in elements {
                    items.observe(element);
                }
            }
            _ => {}
        }
    }

    fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        match self.kinds.as_slice() {
            [] => {}
            [kind] => {
                schema.insert("type".into(), Value::from(*kind));
            }
            kinds => {
                schema.insert("type".into(), Value::from(kinds.to_vec()));
            }
        }

        if self.objects > 0 {
            let properties: Map<String, Value> = self
                .properties
                .iter()
                .map(|(name, _, shape)| (name.clone(), shape.to_schema()))
                .collect();
            let required: Vec<Value> = self
                .properties
                .iter()
                .filter(|(_, seen, _)| *seen == self.objects)
                .map(|(name, _, _)| Value::String(name.clone()))
                .collect();
            schema.insert("properties".into(), Value::Object(properties));
            if !required.is_empty() {
                schema.insert("required".into(), Value::Array(required));
            }
        }

        if let Some(items) = &self.items {
            schema.insert("items".into(), items.to_schema());
        }

        Value::Object(schema)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
