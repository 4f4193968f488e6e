//! Test infrastructure for the query layer.
//!
//! This module provides a shared catalog, seeded documents and small
//! helpers used across the integration tests.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

use serde_json::Value;

/// Extracts a string field from every document.
pub fn field<'a>(documents: &'a [Value], name: &str) -> Vec<&'a str> {
    documents
        .iter()
        .map(|doc| doc[name].as_str().unwrap_or_default())
        .collect()
}

/// Extracts an integer field from every document.
pub fn int_field(documents: &[Value], name: &str) -> Vec<i64> {
    documents
        .iter()
        .map(|doc| doc[name].as_i64().unwrap_or_default())
        .collect()
}

/// Formats `isbn/edition` for every book.
pub fn book_keys(documents: &[Value]) -> Vec<String> {
    documents
        .iter()
        .map(|doc| format!("{}/{}", doc["isbn"].as_str().unwrap_or_default(), doc["edition"]))
        .collect()
}
