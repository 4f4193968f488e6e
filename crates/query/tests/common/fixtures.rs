//! Catalog and document fixtures.
//!
//! The catalog declares three resources:
//!
//! - `Book` - composite identifier (`isbn`, `edition`), every built-in filter
//! - `Shelf` - integer identifier, pagination disabled, default order by position
//! - `Review` - integer identifier, partial pagination with two items per page

use std::sync::Arc;

use serde_json::{Value, json};

use tessera_query::backends::MemoryBackend;
use tessera_query::core::QueryPipeline;
use tessera_query::metadata::{
    FilterConfig, FilterKind, OperationConfig, PaginationOverride, QueryConfig, ResourceConfig,
};
use tessera_query::types::{IdentifierProperty, ValueType};

/// Builds the `Book` resource.
pub fn book_resource() -> ResourceConfig {
    ResourceConfig::new(
        "Book",
        vec![
            IdentifierProperty::new("isbn", ValueType::String),
            IdentifierProperty::new("edition", ValueType::Integer),
        ],
    )
    .with_property("title", ValueType::String)
    .with_property("status", ValueType::String)
    .with_property("price", ValueType::Decimal)
    .with_property("available", ValueType::Boolean)
    .with_property("released", ValueType::DateTime)
    .with_operation(
        OperationConfig::collection("get_collection")
            .with_filter("book.status")
            .with_filter("book.status_exclude")
            .with_filter("book.price")
            .with_filter("book.available")
            .with_filter("book.released"),
    )
    .with_operation(OperationConfig::collection("search").with_filter("book.unregistered").with_filter("book.status"))
    .with_operation(OperationConfig::item("get").with_filter("book.status"))
}

/// Builds the `Shelf` resource.
pub fn shelf_resource() -> ResourceConfig {
    ResourceConfig::new("Shelf", vec![IdentifierProperty::new("id", ValueType::Integer)])
        .with_property("position", ValueType::Integer)
        .with_property("label", ValueType::String)
        .with_default_order(["position"])
        .with_pagination(PaginationOverride {
            enabled: Some(false),
            ..Default::default()
        })
        .with_operation(OperationConfig::collection("get_collection"))
}

/// Builds the `Review` resource.
pub fn review_resource() -> ResourceConfig {
    ResourceConfig::new("Review", vec![IdentifierProperty::new("id", ValueType::Integer)])
        .with_property("rating", ValueType::Integer)
        .with_default_order(["id"])
        .with_pagination(PaginationOverride {
            partial: Some(true),
            items_per_page: Some(2),
            ..Default::default()
        })
        .with_operation(OperationConfig::collection("get_collection"))
}

/// Builds the full catalog.
pub fn catalog() -> QueryConfig {
    QueryConfig {
        resources: vec![book_resource(), shelf_resource(), review_resource()],
        filters: vec![
            FilterConfig::new("book.status", FilterKind::Exact, ["status"]),
            FilterConfig::new("book.status_exclude", FilterKind::Exclude, ["status"]),
            FilterConfig::new("book.price", FilterKind::Range, ["price"]),
            FilterConfig::new("book.available", FilterKind::Boolean, ["available"]),
            FilterConfig::new("book.released", FilterKind::Range, ["released"]),
        ],
        ..Default::default()
    }
}

/// Seven books; `978-1` exists in two editions.
pub fn books() -> Vec<Value> {
    vec![
        json!({"isbn": "978-1", "edition": 1, "title": "Dune", "status": "published", "price": 12.5, "available": true, "released": "2019-03-01T00:00:00Z"}),
        json!({"isbn": "978-1", "edition": 2, "title": "Dune", "status": "published", "price": 15.0, "available": false, "released": "2021-06-15T00:00:00Z"}),
        json!({"isbn": "978-2", "edition": 1, "title": "Emma", "status": "draft", "price": 8, "available": true, "released": "2018-01-20T00:00:00Z"}),
        json!({"isbn": "978-3", "edition": 1, "title": "Ubik", "status": "published", "price": 20, "available": true, "released": "2020-11-02T00:00:00Z"}),
        json!({"isbn": "978-4", "edition": 1, "title": "Kindred", "status": "archived", "price": 9.99, "available": false, "released": "2017-07-07T00:00:00Z"}),
        json!({"isbn": "978-5", "edition": 1, "title": "Beloved", "status": "published", "price": 30, "available": true, "released": "2022-02-14T00:00:00Z"}),
        json!({"isbn": "978-6", "edition": 1, "title": "Solaris", "status": "draft", "price": 11, "available": false, "released": "2016-09-30T00:00:00Z"}),
    ]
}

/// Seven shelves, stored out of position order.
pub fn shelves() -> Vec<Value> {
    [4, 7, 1, 3, 6, 2, 5]
        .into_iter()
        .map(|position| json!({"id": position * 10, "position": position, "label": format!("shelf-{}", position)}))
        .collect()
}

/// Five reviews with ids 1 to 5.
pub fn reviews() -> Vec<Value> {
    (1..=5)
        .map(|id| json!({"id": id, "rating": id % 3 + 1}))
        .collect()
}

/// Creates a memory backend seeded with every fixture document.
pub fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.extend("Book", books());
    backend.extend("Shelf", shelves());
    backend.extend("Review", reviews());
    backend
}

/// Creates a pipeline over the catalog and a seeded memory backend.
pub fn seeded_pipeline() -> (QueryPipeline, Arc<MemoryBackend>) {
    let backend = seeded_backend();
    let pipeline = QueryPipeline::from_config(catalog(), backend.clone())
        .expect("catalog should build a pipeline");
    (pipeline, backend)
}
