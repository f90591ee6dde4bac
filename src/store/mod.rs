//! Endpoint record store
//!
//! An endpoint is one stored JSON collection plus the name of the property
//! that identifies its records. Stores keep endpoints under `rec`-prefixed
//! record ids; the prefix is stripped from ids shown to clients.

mod memory;

pub use memory::{MemoryStore, DEFAULT_FIRST_PAGE_SIZE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of every store record id
pub const REC_PREFIX: &str = "rec";

/// Record store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// No endpoint has this record id
    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// The backing store failed
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// A stored endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Record id, `rec`-prefixed
    pub id: String,
    /// Property holding each record's id, used for cursor pagination
    pub id_prop_name: String,
    /// The collection as JSON text
    pub raw: String,
}

/// Fields for a new endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEndpoint {
    /// Property holding each record's id
    pub id_prop_name: String,
    /// The collection as JSON text
    pub raw: String,
}

/// Partial update of an endpoint; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointUpdate {
    /// Record id of the endpoint to update
    pub id: String,
    /// New id property name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_prop_name: Option<String>,
    /// New collection text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Storage for endpoints
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one endpoint
    async fn find(&self, id: &str) -> Result<Endpoint, StoreError>;

    /// Store new endpoints, returning them with their assigned ids
    async fn create(&self, records: Vec<NewEndpoint>) -> Result<Vec<Endpoint>, StoreError>;

    /// Apply partial updates, returning the updated endpoints
    ///
    /// Fails without applying anything if any id is unknown.
    async fn update(&self, records: Vec<EndpointUpdate>) -> Result<Vec<Endpoint>, StoreError>;

    /// Delete an endpoint, returning what was deleted
    async fn destroy(&self, id: &str) -> Result<Endpoint, StoreError>;

    /// The first page of endpoints, oldest first
    async fn list_first_page(&self) -> Result<Vec<Endpoint>, StoreError>;
}

/// Store record id for a public endpoint id
pub fn to_rec_id(id: &str) -> String {
    format!("{}{}", REC_PREFIX, id)
}

/// Public endpoint id for a store record id
pub fn from_rec_id(rec_id: &str) -> &str {
    rec_id.strip_prefix(REC_PREFIX).unwrap_or(rec_id)
}
