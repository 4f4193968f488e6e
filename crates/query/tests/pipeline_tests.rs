//! End-to-end pipeline tests against the memory backend.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use tessera_query::backends::MemoryBackend;
use tessera_query::core::{
    CollectionExtension, ExtensionRegistry, ExtensionStage, Operation, QueryExecutor, QueryOutput,
    QueryPipeline, RequestContext, ResultExtension,
};
use tessera_query::error::{ConfigError, ErrorClass, FilterError, MetadataError, QueryError, QueryResult};
use tessera_query::extensions::{FilterExtension, OrderExtension, PaginationExtension};
use tessera_query::filter::FilterRegistry;
use tessera_query::identifier::IdentifierCodec;
use tessera_query::metadata::{
    FilterConfig, FilterKind, MetadataRegistry, OperationConfig, OrderConfig, PaginationConfig,
    PaginationOverride, QueryConfig, ResourceMetadata,
};
use tessera_query::types::{Condition, Page, PageInfo, QueryPlan};

use common::*;

fn books_op() -> Operation {
    Operation::collection("Book", "get_collection")
}

// ============================================================================
// Test Doubles
// ============================================================================

/// Counts the calls reaching the wrapped memory backend.
#[derive(Default)]
struct CountingExecutor {
    inner: MemoryBackend,
    executes: AtomicUsize,
    counts: AtomicUsize,
}

#[async_trait]
impl QueryExecutor for CountingExecutor {
    fn backend_name(&self) -> &str {
        "counting"
    }

    async fn execute(&self, plan: &QueryPlan) -> QueryResult<Vec<Value>> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(plan).await
    }

    async fn count(&self, plan: &QueryPlan) -> QueryResult<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(plan).await
    }
}

/// Claims the result when `claim` is set, and records how often it produced one.
///
/// Applying adds a `title != name` condition, which every fixture book satisfies.
struct Claiming {
    name: &'static str,
    claim: bool,
    calls: AtomicUsize,
}

impl Claiming {
    fn new(name: &'static str, claim: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            claim,
            calls: AtomicUsize::new(0),
        })
    }
}

impl CollectionExtension for Claiming {
    fn name(&self) -> &str {
        self.name
    }

    fn apply_to_collection(
        &self,
        plan: &mut QueryPlan,
        _resource: &ResourceMetadata,
        _operation: &Operation,
        _context: &RequestContext,
    ) -> QueryResult<()> {
        plan.and_where(Condition::neq("title", self.name));
        Ok(())
    }
}

#[async_trait]
impl ResultExtension for Claiming {
    fn supports_result(
        &self,
        _resource: &ResourceMetadata,
        _operation: &Operation,
        _context: &RequestContext,
    ) -> bool {
        self.claim
    }

    async fn get_result(
        &self,
        executor: &dyn QueryExecutor,
        plan: QueryPlan,
        _resource: &ResourceMetadata,
        _operation: &Operation,
        _context: &RequestContext,
    ) -> QueryResult<QueryOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items = executor.execute(&plan).await?;
        let info = PageInfo::partial(1, items.len() as u64, false);
        Ok(QueryOutput::Page(Page::new(items, info)))
    }
}

/// Always fails.
struct Explode;

impl CollectionExtension for Explode {
    fn name(&self) -> &str {
        "explode"
    }

    fn apply_to_collection(
        &self,
        _plan: &mut QueryPlan,
        _resource: &ResourceMetadata,
        _operation: &Operation,
        _context: &RequestContext,
    ) -> QueryResult<()> {
        Err(FilterError::InvalidFilterValue {
            parameter: "boom".to_string(),
            value: String::new(),
            reason: "always fails".to_string(),
        }
        .into())
    }
}

fn custom_pipeline(extensions: ExtensionRegistry, executor: Arc<CountingExecutor>) -> QueryPipeline {
    executor.inner.extend("Book", books());
    QueryPipeline::new(
        Arc::new(MetadataRegistry::from_configs(vec![book_resource()]).unwrap()),
        Arc::new(FilterRegistry::new()),
        Arc::new(extensions),
        IdentifierCodec::default(),
        executor,
    )
}

// ============================================================================
// Result Ownership
// ============================================================================

#[tokio::test]
async fn test_last_supporting_result_extension_owns_result() {
    let first = Claiming::new("first", true);
    let second = Claiming::new("second", true);
    let executor = Arc::new(CountingExecutor::default());
    let pipeline = custom_pipeline(
        ExtensionRegistry::builder()
            .result(ExtensionStage::Filter, first.clone())
            .result(ExtensionStage::Result, second.clone())
            .build(),
        executor.clone(),
    );

    let planned = pipeline.plan_collection(&books_op(), &RequestContext::default()).unwrap();
    assert_eq!(planned.result_owner(), Some("second"));
    assert_eq!(planned.applied, vec!["first", "second"]);
    assert_eq!(
        planned.plan.conditions(),
        &[Condition::neq("title", "first"), Condition::neq("title", "second")]
    );

    let output = pipeline.collection(&books_op(), &RequestContext::default()).await.unwrap();
    assert_eq!(output.as_page().map(|p| p.len()), Some(7));
    assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    assert_eq!(executor.executes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_supporting_extension_does_not_claim() {
    let first = Claiming::new("first", true);
    let second = Claiming::new("second", false);
    let executor = Arc::new(CountingExecutor::default());
    let pipeline = custom_pipeline(
        ExtensionRegistry::builder()
            .result(ExtensionStage::Filter, first.clone())
            .result(ExtensionStage::Result, second.clone())
            .build(),
        executor,
    );

    pipeline.collection(&books_op(), &RequestContext::default()).await.unwrap();
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unowned_result_goes_to_executor() {
    let executor = Arc::new(CountingExecutor::default());
    let pipeline = custom_pipeline(
        ExtensionRegistry::builder()
            .result(ExtensionStage::Result, Claiming::new("idle", false))
            .build(),
        executor.clone(),
    );

    let output = pipeline.collection(&books_op(), &RequestContext::default()).await.unwrap();
    assert!(matches!(output, QueryOutput::Collection(ref items) if items.len() == 7));
    assert_eq!(executor.executes.load(Ordering::SeqCst), 1);
    assert_eq!(executor.counts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_extension_aborts_before_execution() {
    let executor = Arc::new(CountingExecutor::default());
    let pipeline = custom_pipeline(
        ExtensionRegistry::builder()
            .collection(ExtensionStage::Order, Arc::new(Explode))
            .result(ExtensionStage::Result, Claiming::new("never", true))
            .build(),
        executor.clone(),
    );

    let err = pipeline
        .collection(&books_op(), &RequestContext::default())
        .await
        .unwrap_err();

    match &err {
        QueryError::Build(failure) => assert_eq!(failure.extension, "explode"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(executor.executes.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Built-in Extensions
// ============================================================================

#[tokio::test]
async fn test_order_without_pagination_returns_everything() {
    let (pipeline, _) = seeded_pipeline();

    let output = pipeline
        .collection(&Operation::collection("Shelf", "get_collection"), &RequestContext::default())
        .await
        .unwrap();

    match output {
        QueryOutput::Collection(items) => {
            assert_eq!(int_field(&items, "position"), vec![1, 2, 3, 4, 5, 6, 7]);
        }
        other => panic!("expected a raw collection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_order_only_pipeline() {
    let backend = Arc::new(MemoryBackend::new());
    backend.extend("Shelf", shelves());
    let pipeline = QueryPipeline::new(
        Arc::new(MetadataRegistry::from_configs(vec![shelf_resource()]).unwrap()),
        Arc::new(FilterRegistry::new()),
        Arc::new(
            ExtensionRegistry::builder()
                .collection(ExtensionStage::Order, Arc::new(OrderExtension::default()))
                .build(),
        ),
        IdentifierCodec::default(),
        backend,
    );

    let output = pipeline
        .collection(
            &Operation::collection("Shelf", "get_collection"),
            &RequestContext::from_query("sort=-position"),
        )
        .await
        .unwrap();

    assert_eq!(int_field(output.items(), "position"), vec![7, 6, 5, 4, 3, 2, 1]);
    assert!(output.as_page().is_none());
}

#[tokio::test]
async fn test_pagination_totals_reflect_filters() {
    let (pipeline, _) = seeded_pipeline();
    let context = RequestContext::from_query("status=published&itemsPerPage=3&sort=price");

    let output = pipeline.collection(&books_op(), &context).await.unwrap();
    let page = output.as_page().expect("paginated result");

    assert_eq!(book_keys(&page.items), vec!["978-1/1", "978-1/2", "978-3/1"]);
    assert_eq!(page.page_info.total, Some(4));
    assert_eq!(page.page_info.last_page(), Some(2));
    assert!(page.page_info.has_next);
    assert!(!page.page_info.has_previous);

    let second = pipeline
        .collection(&books_op(), &RequestContext::from_query("status=published&itemsPerPage=3&sort=price&page=2"))
        .await
        .unwrap();
    let second = second.as_page().unwrap();
    assert_eq!(book_keys(&second.items), vec!["978-5/1"]);
    assert!(!second.page_info.has_next);
    assert!(second.page_info.has_previous);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let (pipeline, _) = seeded_pipeline();

    let output = pipeline
        .collection(&books_op(), &RequestContext::from_query("page=5"))
        .await
        .unwrap();
    let page = output.as_page().unwrap();
    assert!(page.is_empty());
    assert_eq!(page.page_info.total, Some(7));
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let (pipeline, _) = seeded_pipeline();

    let output = pipeline
        .collection(&books_op(), &RequestContext::from_query("itemsPerPage=5000"))
        .await
        .unwrap();
    assert_eq!(output.as_page().unwrap().page_info.items_per_page, 100);
}

#[tokio::test]
async fn test_client_cannot_disable_pagination_by_default() {
    let (pipeline, _) = seeded_pipeline();

    let output = pipeline
        .collection(&books_op(), &RequestContext::from_query("pagination=false"))
        .await
        .unwrap();
    assert!(output.as_page().is_some());
}

#[tokio::test]
async fn test_partial_pagination_skips_count() {
    let executor = Arc::new(CountingExecutor::default());
    executor.inner.extend("Review", reviews());
    let config = catalog();
    let pipeline = QueryPipeline::from_config(config, executor.clone()).unwrap();
    let reviews_op = Operation::collection("Review", "get_collection");

    let first = pipeline.collection(&reviews_op, &RequestContext::default()).await.unwrap();
    let first = first.as_page().unwrap();
    assert_eq!(int_field(&first.items, "id"), vec![1, 2]);
    assert_eq!(first.page_info.total, None);
    assert!(first.page_info.has_next);

    let last = pipeline
        .collection(&reviews_op, &RequestContext::from_query("page=3"))
        .await
        .unwrap();
    let last = last.as_page().unwrap();
    assert_eq!(int_field(&last.items, "id"), vec![5]);
    assert!(!last.page_info.has_next);

    assert_eq!(executor.counts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_filter_is_skipped() {
    let (pipeline, _) = seeded_pipeline();

    let output = pipeline
        .collection(&Operation::collection("Book", "search"), &RequestContext::from_query("status=draft"))
        .await
        .unwrap();

    assert_eq!(field(output.items(), "title"), vec!["Emma", "Solaris"]);
}

#[tokio::test]
async fn test_invalid_filter_value_fails_the_run() {
    let (pipeline, _) = seeded_pipeline();

    let err = pipeline
        .collection(&books_op(), &RequestContext::from_query("price[gte]=cheap"))
        .await
        .unwrap_err();

    match &err {
        QueryError::Build(failure) => {
            assert_eq!(failure.extension, FilterExtension::NAME);
            assert!(matches!(
                *failure.source,
                QueryError::Filter(FilterError::InvalidFilterValue { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.class(), ErrorClass::BadRequest);
}

#[tokio::test]
async fn test_invalid_page_fails_the_run() {
    let (pipeline, _) = seeded_pipeline();

    let err = pipeline
        .collection(&books_op(), &RequestContext::from_query("page=0"))
        .await
        .unwrap_err();

    assert!(matches!(&err, QueryError::Build(failure) if failure.extension == PaginationExtension::NAME));
}

#[test]
fn test_registered_extension_order() {
    let (pipeline, _) = seeded_pipeline();

    let planned = pipeline
        .plan_collection(&books_op(), &RequestContext::default())
        .unwrap();
    assert_eq!(
        planned.applied,
        vec![FilterExtension::NAME, OrderExtension::NAME, PaginationExtension::NAME]
    );
    assert_eq!(planned.result_owner(), Some(PaginationExtension::NAME));
}

#[test]
fn test_manual_assembly_matches_from_config() {
    let filters = Arc::new(FilterRegistry::from_configs(&catalog().filters, Default::default()).unwrap());
    let filter_extension = Arc::new(FilterExtension::new(Arc::clone(&filters)));
    let extensions = ExtensionRegistry::builder()
        .result(ExtensionStage::Result, Arc::new(PaginationExtension::new(PaginationConfig::default())))
        .collection(ExtensionStage::Order, Arc::new(OrderExtension::new(OrderConfig::default())))
        .collection(ExtensionStage::Filter, filter_extension.clone())
        .item(ExtensionStage::Filter, filter_extension)
        .build();
    assert_eq!(
        extensions.collection_names(),
        vec![
            (ExtensionStage::Filter, FilterExtension::NAME),
            (ExtensionStage::Order, OrderExtension::NAME),
            (ExtensionStage::Result, PaginationExtension::NAME),
        ]
    );

    let pipeline = QueryPipeline::new(
        Arc::new(MetadataRegistry::from_configs(catalog().resources).unwrap()),
        filters,
        Arc::new(extensions),
        IdentifierCodec::default(),
        seeded_backend(),
    );
    let planned = pipeline
        .plan_collection(&books_op(), &RequestContext::from_query("status=draft&sort=-price"))
        .unwrap();
    assert_eq!(
        planned.plan.to_string(),
        "FROM Book WHERE status = draft ORDER BY price DESC, isbn ASC, edition ASC LIMIT 30 OFFSET 0"
    );
}

// ============================================================================
// Metadata and Parameters
// ============================================================================

#[test]
fn test_unknown_operation_and_kind_mismatch() {
    let (pipeline, _) = seeded_pipeline();

    let unknown = pipeline
        .plan_collection(&Operation::collection("Book", "delete"), &RequestContext::default())
        .unwrap_err();
    assert!(matches!(unknown, QueryError::Metadata(MetadataError::UnknownOperation { .. })));
    assert_eq!(unknown.class(), ErrorClass::NotFound);

    let mismatch = pipeline
        .plan_collection(&Operation::collection("Book", "get"), &RequestContext::default())
        .unwrap_err();
    assert!(matches!(mismatch, QueryError::Metadata(MetadataError::OperationKindMismatch { .. })));

    let missing = pipeline
        .plan_collection(&Operation::collection("Author", "get_collection"), &RequestContext::default())
        .unwrap_err();
    assert!(matches!(missing, QueryError::Metadata(MetadataError::UnknownResource { .. })));
}

#[test]
fn test_validate_parameters() {
    let (pipeline, _) = seeded_pipeline();

    let schema = pipeline.parameter_schema(&books_op()).unwrap();
    assert!(schema.contains_key("status"));
    assert!(schema.contains_key("status[]"));
    assert!(schema.contains_key("status[neq]"));
    assert!(schema.contains_key("price[between]"));
    assert!(schema.contains_key("available"));

    let ok = pipeline
        .validate_parameters(&books_op(), &RequestContext::from_query("status=draft&price[between]=1..5"))
        .unwrap();
    assert!(ok.is_empty());

    let violations = pipeline
        .validate_parameters(
            &books_op(),
            &RequestContext::from_query("available=maybe&price[between]=10&status=a&status=b"),
        )
        .unwrap();
    let parameters: Vec<&str> = violations.iter().map(|v| v.parameter.as_str()).collect();
    assert_eq!(parameters, vec!["available", "price[between]", "status"]);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_catalog_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(&catalog()).unwrap().as_bytes())
        .unwrap();

    let config = QueryConfig::from_path(file.path()).unwrap();
    assert_eq!(config, catalog());

    let pipeline = QueryPipeline::from_config(config, seeded_backend()).unwrap();
    let output = pipeline
        .collection(&books_op(), &RequestContext::from_query("available=true&sort=title"))
        .await
        .unwrap();
    assert_eq!(field(output.items(), "title"), vec!["Beloved", "Dune", "Emma", "Ubik"]);
}

#[test]
fn test_catalog_load_errors() {
    let missing = QueryConfig::from_path("/nonexistent/catalog.json").unwrap_err();
    assert!(matches!(missing, QueryError::Config(ConfigError::Load { .. })));

    let malformed = QueryConfig::from_json_str("{\"resources\": 3}").unwrap_err();
    assert!(matches!(malformed, QueryError::Config(ConfigError::Load { .. })));

    let mut duplicated = catalog();
    duplicated.resources.push(book_resource());
    let err = QueryPipeline::from_config(duplicated, seeded_backend()).unwrap_err();
    assert!(matches!(err, QueryError::Config(ConfigError::DuplicateResource { .. })));
}

#[test]
fn test_resource_pagination_override_is_validated() {
    let mut empty_pages = catalog();
    empty_pages.resources[2] = review_resource().with_pagination(PaginationOverride {
        items_per_page: Some(0),
        ..Default::default()
    });
    let err = QueryPipeline::from_config(empty_pages, seeded_backend()).unwrap_err();
    match &err {
        QueryError::Config(ConfigError::InvalidPagination { message }) => {
            assert!(message.contains("Review"), "message should name the resource: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.class(), ErrorClass::Internal);

    let mut low_max = catalog();
    low_max.resources[2] = review_resource().with_pagination(PaginationOverride {
        items_per_page: Some(20),
        max_items_per_page: Some(10),
        ..Default::default()
    });
    let err = QueryPipeline::from_config(low_max, seeded_backend()).unwrap_err();
    assert!(matches!(err, QueryError::Config(ConfigError::InvalidPagination { .. })));
}

#[test]
fn test_filter_over_undeclared_property_is_rejected() {
    let mut config = catalog();
    config
        .filters
        .push(FilterConfig::new("book.rating", FilterKind::Range, ["rating"]));
    config.resources[0] = book_resource()
        .with_operation(OperationConfig::collection("top_rated").with_filter("book.rating"));

    let err = QueryPipeline::from_config(config, seeded_backend()).unwrap_err();
    match err {
        QueryError::Config(ConfigError::UnknownFilterProperty { resource, filter_id, property }) => {
            assert_eq!(resource, "Book");
            assert_eq!(filter_id, "book.rating");
            assert_eq!(property, "rating");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_minimal_json_catalog_uses_defaults() {
    let config = QueryConfig::from_json_str(
        &json!({
            "resources": [{
                "name": "Tag",
                "identifiers": [{"property": "slug"}],
                "operations": [{"name": "list", "kind": "collection"}]
            }]
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(config.pagination, PaginationConfig::default());
    assert_eq!(config.order, OrderConfig::default());

    let pipeline = QueryPipeline::from_config(config, Arc::new(MemoryBackend::new())).unwrap();
    let planned = pipeline
        .plan_collection(&Operation::collection("Tag", "list"), &RequestContext::default())
        .unwrap();
    assert_eq!(planned.plan.to_string(), "FROM Tag LIMIT 30 OFFSET 0");
}
