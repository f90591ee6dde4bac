#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! # jsonrest-query
//!
//! In-memory OData-style query engine over JSON arrays

pub mod query;
