#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # jsonrest
//!
//! Serve stored JSON arrays as queryable REST endpoints.
//!
//! An endpoint is a JSON array held in a record store. Clients list, create,
//! update and delete endpoints, infer a schema for one, and query one with
//! OData-style URL parameters (`filter`, `orderby`, `select`, and three
//! pagination modes). Querying is done by the `jsonrest-query` engine, which
//! this crate re-exports as [`query`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | TOML configuration and defaults |
//! | [`error`] | Error type and HTTP status mapping |
//! | [`schema`] | JSON Schema inference |
//! | [`service`] | Endpoint operations and replies |
//! | [`store`] | Record store trait and in-memory store |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use jsonrest::config::QueryConfig;
//! use jsonrest::service::EndpointService;
//! use jsonrest::store::MemoryStore;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let service = EndpointService::new(Arc::new(MemoryStore::new()), QueryConfig::default());
//! let endpoint = service
//!     .create(None, json!([{ "id": 1, "age": 40 }, { "id": 2, "age": 20 }]))
//!     .await
//!     .unwrap();
//!
//! let result = service.query(&endpoint.id, "filter=age gt 30").await.unwrap();
//! assert_eq!(result.data, vec![json!({ "id": 1, "age": 40 })]);
//! # });
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod service;
pub mod store;

pub use jsonrest_query::query;

pub use config::Config;
pub use error::{JsonRestError, Result};
pub use service::{EndpointService, Reply};
pub use store::{Endpoint, MemoryStore, RecordStore};
