//! Endpoint operations
//!
//! [`EndpointService`] wires a [`RecordStore`] to the query engine. Every
//! operation returns a [`Result`]; a transport turns it into a [`Reply`],
//! which carries the HTTP status and the JSON body to send.
//!
//! Endpoint ids handed to clients are public ids (the store's `rec` prefix
//! stripped). Operations accept either form.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use jsonrest_query::query::{execute, IdProperty, QueryOptions, QueryResult};

use crate::config::QueryConfig;
use crate::error::{JsonRestError, Result};
use crate::schema::infer_schema;
use crate::store::{
    from_rec_id, to_rec_id, Endpoint, EndpointUpdate, NewEndpoint, RecordStore, REC_PREFIX,
};

/// Title given to inferred schemas
pub const SCHEMA_TITLE: &str = "data";

/// Endpoint operations over a record store
#[derive(Debug)]
pub struct EndpointService<S: RecordStore> {
    store: Arc<S>,
    config: QueryConfig,
}

impl<S: RecordStore> Clone for EndpointService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: RecordStore> EndpointService<S> {
    /// Create a service over `store`
    pub fn new(store: Arc<S>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Query defaults in use
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// First page of endpoints
    pub async fn list(&self) -> Result<Vec<Endpoint>> {
        let endpoints = self.store.list_first_page().await?;
        Ok(endpoints.into_iter().map(public).collect())
    }

    /// Store a new endpoint holding `raw`, which must be a JSON array
    ///
    /// `id_prop_name` falls back to the configured default.
    pub async fn create(&self, id_prop_name: Option<&str>, raw: Value) -> Result<Endpoint> {
        let raw = collection_text(raw)?;
        let id_prop_name = id_prop_name.unwrap_or(&self.config.id_prop_name);
        IdProperty::new(id_prop_name)?;

        let mut created = self
            .store
            .create(vec![NewEndpoint {
                id_prop_name: id_prop_name.to_string(),
                raw,
            }])
            .await?;
        let endpoint = created
            .pop()
            .ok_or_else(|| JsonRestError::InvalidRequest("store created no endpoint".into()))?;

        info!(id = from_rec_id(&endpoint.id), id_prop_name, "endpoint created");
        Ok(public(endpoint))
    }

    /// Run `query_string` against an endpoint's collection
    pub async fn query(&self, id: &str, query_string: &str) -> Result<QueryResult> {
        let endpoint = self.store.find(&rec_id(id)).await?;
        let collection = parse_collection(&endpoint.raw)?;
        let options = QueryOptions::from_query_string(query_string, &self.config.param_defaults())?;
        let cursor = IdProperty::new(&endpoint.id_prop_name)?;

        Ok(execute(collection, &options, &cursor)?)
    }

    /// Apply a partial update to an endpoint
    ///
    /// `fields` is an object holding `idPropName` and/or `raw`. An `id` field
    /// is ignored. `raw` may be the collection itself or its JSON text.
    pub async fn update(&self, id: &str, fields: Value) -> Result<Endpoint> {
        let Value::Object(mut fields) = fields else {
            return Err(JsonRestError::InvalidRequest(
                "update body must be a JSON object".into(),
            ));
        };
        fields.remove("id");

        let update = EndpointUpdate {
            id: rec_id(id),
            id_prop_name: take_id_prop_name(&mut fields)?,
            raw: fields.remove("raw").map(collection_text).transpose()?,
        };
        if let Some(unknown) = fields.keys().next() {
            return Err(JsonRestError::InvalidRequest(format!(
                "unknown endpoint field: {}",
                unknown
            )));
        }

        let endpoint = self
            .store
            .update(vec![update])
            .await?
            .pop()
            .ok_or_else(|| JsonRestError::InvalidRequest("store updated no endpoint".into()))?;

        info!(id = from_rec_id(&endpoint.id), "endpoint updated");
        Ok(public(endpoint))
    }

    /// Delete an endpoint, returning what was deleted
    pub async fn delete(&self, id: &str) -> Result<Endpoint> {
        let endpoint = self.store.destroy(&rec_id(id)).await?;
        info!(id = from_rec_id(&endpoint.id), "endpoint deleted");
        Ok(public(endpoint))
    }

    /// Infer a JSON Schema for an endpoint's collection
    pub async fn schema(&self, id: &str) -> Result<Value> {
        let endpoint = self.store.find(&rec_id(id)).await?;
        let collection = parse_collection(&endpoint.raw)?;
        Ok(infer_schema(SCHEMA_TITLE, &collection))
    }
}

/// Status and JSON body for a finished operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Value,
}

impl Reply {
    /// 200 with `body`
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Error status with `{"error": message}`
    pub fn from_error(err: &JsonRestError) -> Self {
        let status = err.status_code();
        if err.is_client_error() {
            warn!(status, error = %err, "request rejected");
        } else {
            error!(status, error = %err, "request failed");
        }
        Self {
            status,
            body: json!({ "error": err.to_string() }),
        }
    }

    /// Reply for any operation result
    pub fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result.and_then(|value| Ok(serde_json::to_value(value)?)) {
            Ok(body) => Self::ok(body),
            Err(err) => Self::from_error(&err),
        }
    }

    /// Returns true for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn rec_id(id: &str) -> String {
    if id.starts_with(REC_PREFIX) {
        id.to_string()
    } else {
        to_rec_id(id)
    }
}

fn public(mut endpoint: Endpoint) -> Endpoint {
    endpoint.id = from_rec_id(&endpoint.id).to_string();
    endpoint
}

fn parse_collection(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(records) => Ok(records),
        other => Err(JsonRestError::InvalidCollection(format!(
            "expected a JSON array, found {}",
            article_kind(&other)
        ))),
    }
}

/// JSON text for a submitted collection, given as an array or as text
fn collection_text(raw: Value) -> Result<String> {
    match raw {
        Value::Array(_) => Ok(raw.to_string()),
        Value::String(text) => {
            parse_collection(&text).map_err(|err| match err {
                JsonRestError::Json(e) => {
                    JsonRestError::InvalidCollection(format!("raw is not valid JSON: {}", e))
                }
                other => other,
            })?;
            Ok(text)
        }
        other => Err(JsonRestError::InvalidCollection(format!(
            "expected a JSON array, found {}",
            article_kind(&other)
        ))),
    }
}

fn take_id_prop_name(fields: &mut Map<String, Value>) -> Result<Option<String>> {
    match fields.remove("idPropName") {
        None => Ok(None),
        Some(Value::String(name)) => {
            IdProperty::new(&name)?;
            Ok(Some(name))
        }
        Some(_) => Err(JsonRestError::InvalidRequest(
            "idPropName must be a string".into(),
        )),
    }
}

fn article_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn service() -> EndpointService<MemoryStore> {
        EndpointService::new(Arc::new(MemoryStore::new()), QueryConfig::default())
    }

    #[test]
    fn test_rec_id_accepts_both_forms() {
        assert_eq!(rec_id("abc"), "recabc");
        assert_eq!(rec_id("recabc"), "recabc");
    }

    #[test]
    fn test_collection_text() {
        assert_eq!(collection_text(json!([1, 2])).unwrap(), "[1,2]");
        assert_eq!(collection_text(json!("[1, 2]")).unwrap(), "[1, 2]");
        assert!(matches!(
            collection_text(json!({ "a": 1 })),
            Err(JsonRestError::InvalidCollection(_))
        ));
        assert!(matches!(
            collection_text(json!("{\"a\":1}")),
            Err(JsonRestError::InvalidCollection(_))
        ));
        assert!(matches!(
            collection_text(json!("[1,")),
            Err(JsonRestError::InvalidCollection(_))
        ));
    }

    #[test]
    fn test_collection_errors_name_the_kind() {
        let err = collection_text(json!(7)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid collection: expected a JSON array, found a number"
        );
        let err = parse_collection("{}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid collection: expected a JSON array, found an object"
        );
    }

    #[tokio::test]
    async fn test_create_returns_public_id() {
        let service = service();
        let endpoint = service.create(None, json!([{ "id": 1 }])).await.unwrap();
        assert!(!endpoint.id.starts_with("rec"));
        assert_eq!(endpoint.id_prop_name, "id");
        assert_eq!(endpoint.raw, r#"[{"id":1}]"#);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_id_prop() {
        let service = service();
        let err = service.create(Some(""), json!([])).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn test_update_strips_id_and_rejects_unknown_fields() {
        let service = service();
        let id = service.create(None, json!([])).await.unwrap().id;

        let updated = service
            .update(&id, json!({ "id": "other", "idPropName": "key" }))
            .await
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.id_prop_name, "key");
        assert_eq!(updated.raw, "[]");

        let err = service
            .update(&id, json!({ "colour": "red" }))
            .await
            .unwrap_err();
        assert!(matches!(err, JsonRestError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_stored_non_array_is_invalid_collection() {
        let service = service();
        let created = service
            .store()
            .create(vec![NewEndpoint {
                id_prop_name: "id".into(),
                raw: r#"{"a":1}"#.into(),
            }])
            .await
            .unwrap();
        let err = service.query(&created[0].id, "").await.unwrap_err();
        assert!(matches!(err, JsonRestError::InvalidCollection(_)));
    }

    #[test]
    fn test_reply_from_result() {
        let reply = Reply::from_result(Ok(json!({ "ok": true })));
        assert_eq!(reply, Reply::ok(json!({ "ok": true })));
        assert!(reply.is_success());

        let not_found = JsonRestError::from(StoreError::NotFound("recx".into()));
        let reply = Reply::from_result::<Value>(Err(not_found));
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body, json!({ "error": "Endpoint not found: recx" }));
    }
}
