//! Tessera Query Layer
//!
//! This crate turns REST-style requests against declared resources into
//! backend-neutral query plans. It decodes path identifiers (simple and
//! composite), runs an ordered chain of query extensions (filtering,
//! ordering, pagination) over a shared plan, and hands the result to a
//! pluggable executor.
//!
//! # Features
//!
//! - **Identifiers**: `42`, `isbn=978-0;edition=2`, typed through a denormalizer chain
//! - **Extensions**: stage-ordered plan mutators with a single result owner
//! - **Filters**: exact, exclude, range and boolean filters bound per operation
//! - **Pagination**: page-number windows with totals, or partial pages without them
//! - **Backends**: an in-memory executor and a SQLite SQL compiler
//!
//! Enable the diagnostic binary with the `cli` feature:
//!
//! ```toml
//! [dependencies]
//! tessera-query = { version = "0.1", features = ["cli"] }
//! ```
//!
//! # Architecture
//!
//! - [`types`] - Values, identifiers, conditions, plans and pages
//! - [`error`] - Error types for all operations
//! - [`identifier`] - Identifier decoding and the denormalizer chain
//! - [`metadata`] - Catalog configuration and the resource registry
//! - [`filter`] - Request filters and parameter schemas
//! - [`core`] - Extension traits, the executor trait and the pipeline
//! - [`extensions`] - Built-in filter, order and pagination extensions
//! - [`backends`] - Executor and compiler implementations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tessera_query::backends::MemoryBackend;
//! use tessera_query::core::{Operation, QueryPipeline, RequestContext};
//! use tessera_query::metadata::QueryConfig;
//!
//! let config = QueryConfig::from_json_str(r#"{
//!     "resources": [{
//!         "name": "Book",
//!         "identifiers": [{"property": "isbn", "type": "string"}],
//!         "properties": {"status": "string", "price": "decimal"},
//!         "operations": [
//!             {"name": "get_collection", "kind": "collection", "filters": ["book.status"]},
//!             {"name": "get", "kind": "item"}
//!         ]
//!     }],
//!     "filters": [{"id": "book.status", "kind": "exact", "properties": ["status"]}]
//! }"#).unwrap();
//!
//! let pipeline = QueryPipeline::from_config(config, Arc::new(MemoryBackend::new())).unwrap();
//!
//! let operation = Operation::collection("Book", "get_collection");
//! let context = RequestContext::from_query("status=published&sort=-price&page=2");
//! let planned = pipeline.plan_collection(&operation, &context).unwrap();
//!
//! assert_eq!(
//!     planned.plan.to_string(),
//!     "FROM Book WHERE status = published ORDER BY price DESC, isbn ASC LIMIT 30 OFFSET 30"
//! );
//! assert_eq!(planned.result_owner(), Some("pagination"));
//! ```
//!
//! # Composite Identifiers
//!
//! ```
//! use tessera_query::identifier::IdentifierCodec;
//! use tessera_query::types::{IdentifierProperty, ResourceIdentifierSpec, TypedValue, ValueType};
//!
//! let spec = ResourceIdentifierSpec::new(
//!     "Book",
//!     vec![
//!         IdentifierProperty::new("isbn", ValueType::String),
//!         IdentifierProperty::new("edition", ValueType::Integer),
//!     ],
//! );
//!
//! let codec = IdentifierCodec::default();
//! let id = codec.decode("isbn=978-0;edition=2", &spec).unwrap();
//! assert_eq!(id.get("edition"), Some(&TypedValue::Integer(2)));
//! assert_eq!(codec.encode(&id, &spec).unwrap(), "isbn=978-0;edition=2");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod extensions;
pub mod filter;
pub mod identifier;
pub mod metadata;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{QueryError, QueryResult};
pub use types::{Condition, IdentifierValue, Page, PageInfo, QueryPlan, TypedValue};

// Re-export core traits
pub use core::{
    CollectionExtension, ItemExtension, Operation, QueryExecutor, QueryOutput, QueryPipeline,
    RequestContext, ResultExtension,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
