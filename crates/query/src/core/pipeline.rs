//! The query-extension pipeline.
//!
//! One pipeline run serves one request:
//!
//! ```text
//! Idle -> CollectingExtensions -> Applying -> ResultOwned | Unowned -> Done
//! ```
//!
//! Extensions run in registry order against a single [`QueryPlan`] owned by
//! the run. Any extension error aborts the run with a
//! [`QueryBuildFailure`] before anything is executed. Among the applied
//! result extensions that report [`supports_result`](ResultExtension::supports_result),
//! only the last one is asked for the result; otherwise the plan goes to the
//! [`QueryExecutor`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigError, QueryBuildFailure, QueryError, QueryResult};
use crate::extensions::{FilterExtension, OrderExtension, PaginationExtension};
use crate::filter::{FilterRegistry, ParameterSchema, ParameterValidator, ParameterViolation};
use crate::identifier::{DenormalizerChain, IdentifierCodec};
use crate::metadata::{MetadataRegistry, OperationMetadata, QueryConfig, ResourceMetadata};
use crate::types::{Condition, IdentifierValue, QueryPlan};

use super::executor::{QueryExecutor, QueryOutput};
use super::extension::{ExtensionRegistry, ExtensionStage, ResultExtension};
use super::operation::{Operation, OperationKind, RequestContext};

/// State of a pipeline run. Transitions are logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing started.
    Idle,
    /// Selecting the extensions applicable to the operation.
    CollectingExtensions,
    /// Applying extensions to the plan.
    Applying,
    /// A result extension produces the result.
    ResultOwned,
    /// The executor produces the result.
    Unowned,
    /// The run finished.
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::CollectingExtensions => "collecting-extensions",
            PipelineState::Applying => "applying",
            PipelineState::ResultOwned => "result-owned",
            PipelineState::Unowned => "unowned",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

struct Run<'a> {
    operation: &'a Operation,
    state: PipelineState,
}

impl<'a> Run<'a> {
    fn new(operation: &'a Operation) -> Self {
        Self {
            operation,
            state: PipelineState::Idle,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug!(
            operation = %self.operation,
            from = %self.state,
            to = %next,
            "Pipeline state transition"
        );
        self.state = next;
    }
}

/// A fully built plan, before execution.
#[derive(Clone)]
pub struct PlannedQuery {
    /// The plan as left by the last extension.
    pub plan: QueryPlan,
    /// Names of the applied extensions, in order.
    pub applied: Vec<String>,
    /// Decoded identifier, for item operations.
    pub identifier: Option<IdentifierValue>,
    owner: Option<Arc<dyn ResultExtension>>,
}

impl PlannedQuery {
    /// Returns the name of the extension that will produce the result.
    pub fn result_owner(&self) -> Option<&str> {
        self.owner.as_ref().map(|ext| ext.name())
    }
}

impl fmt::Debug for PlannedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedQuery")
            .field("plan", &self.plan)
            .field("applied", &self.applied)
            .field("identifier", &self.identifier)
            .field("result_owner", &self.result_owner())
            .finish()
    }
}

/// Turns operation requests into executed queries.
///
/// All collaborators are immutable and shared, so a pipeline can serve
/// concurrent requests.
#[derive(Clone)]
pub struct QueryPipeline {
    metadata: Arc<MetadataRegistry>,
    filters: Arc<FilterRegistry>,
    extensions: Arc<ExtensionRegistry>,
    codec: IdentifierCodec,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryPipeline {
    /// Assembles a pipeline from prebuilt registries.
    pub fn new(
        metadata: Arc<MetadataRegistry>,
        filters: Arc<FilterRegistry>,
        extensions: Arc<ExtensionRegistry>,
        codec: IdentifierCodec,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            metadata,
            filters,
            extensions,
            codec,
            executor,
        }
    }

    /// Builds a pipeline from a catalog with the built-in extensions:
    /// filter, order and pagination, in that order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the global or a per-resource pagination
    /// setting is inconsistent, or if an operation binds a filter over a
    /// property its resource does not declare.
    pub fn from_config(config: QueryConfig, executor: Arc<dyn QueryExecutor>) -> QueryResult<Self> {
        config.pagination.validate()?;
        for resource in &config.resources {
            if let Some(overrides) = &resource.pagination {
                config.pagination.merged(overrides).validate().map_err(|e| match e {
                    ConfigError::InvalidPagination { message } => ConfigError::InvalidPagination {
                        message: format!("resource {}: {}", resource.name, message),
                    },
                    other => other,
                })?;
            }
        }
        let chain = Arc::new(DenormalizerChain::default());
        let filters = Arc::new(FilterRegistry::from_configs(&config.filters, Arc::clone(&chain))?);
        let metadata = Arc::new(MetadataRegistry::from_configs(config.resources)?);
        check_filter_bindings(&metadata, &filters)?;

        let filter_extension = Arc::new(FilterExtension::new(Arc::clone(&filters)));
        let extensions = ExtensionRegistry::builder()
            .collection(ExtensionStage::Filter, filter_extension.clone())
            .item(ExtensionStage::Filter, filter_extension)
            .collection(ExtensionStage::Order, Arc::new(OrderExtension::new(config.order)))
            .result(
                ExtensionStage::Result,
                Arc::new(PaginationExtension::new(config.pagination)),
            )
            .build();

        Ok(Self::new(
            metadata,
            filters,
            Arc::new(extensions),
            IdentifierCodec::new(chain),
            executor,
        ))
    }

    /// Returns the metadata registry.
    pub fn metadata(&self) -> &Arc<MetadataRegistry> {
        &self.metadata
    }

    /// Returns the extension registry.
    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }

    /// Returns the identifier codec.
    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    /// Builds the plan of a collection operation without executing it.
    pub fn plan_collection(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<PlannedQuery> {
        let (resource, _) = self.resolve(operation, OperationKind::Collection)?;
        let mut run = Run::new(operation);
        self.build_collection(&mut run, &resource, context)
    }

    /// Runs a collection operation.
    pub async fn collection(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<QueryOutput> {
        let (resource, _) = self.resolve(operation, OperationKind::Collection)?;
        let mut run = Run::new(operation);
        let planned = self.build_collection(&mut run, &resource, context)?;

        let output = match planned.owner {
            Some(owner) => {
                run.enter(PipelineState::ResultOwned);
                owner
                    .get_result(
                        self.executor.as_ref(),
                        planned.plan,
                        &resource,
                        operation,
                        context,
                    )
                    .await?
            }
            None => {
                run.enter(PipelineState::Unowned);
                QueryOutput::Collection(self.executor.execute(&planned.plan).await?)
            }
        };
        run.enter(PipelineState::Done);
        Ok(output)
    }

    /// Builds the plan of an item operation without executing it.
    ///
    /// Identifier errors are returned as-is: they precede the pipeline.
    pub fn plan_item(
        &self,
        operation: &Operation,
        raw_identifier: &str,
        context: &RequestContext,
    ) -> QueryResult<PlannedQuery> {
        let (resource, _) = self.resolve(operation, OperationKind::Item)?;
        let identifier = self.codec.decode(raw_identifier, resource.identifier())?;
        let mut run = Run::new(operation);
        self.build_item(&mut run, &resource, identifier, context)
    }

    /// Runs an item operation. Returns `None` when nothing matches.
    pub async fn item(
        &self,
        operation: &Operation,
        raw_identifier: &str,
        context: &RequestContext,
    ) -> QueryResult<QueryOutput> {
        let (resource, _) = self.resolve(operation, OperationKind::Item)?;
        let identifier = self.codec.decode(raw_identifier, resource.identifier())?;
        let mut run = Run::new(operation);
        let mut planned = self.build_item(&mut run, &resource, identifier, context)?;

        run.enter(PipelineState::Unowned);
        if planned.plan.window().is_none() {
            planned.plan.set_window(0, 1);
        }
        let item = self.executor.execute(&planned.plan).await?.into_iter().next();
        run.enter(PipelineState::Done);
        Ok(QueryOutput::Item(item))
    }

    /// Describes the parameters accepted by an operation's filters.
    pub fn parameter_schema(&self, operation: &Operation) -> QueryResult<ParameterSchema> {
        let (resource, declared) = self.metadata.resolve(operation)?;
        Ok(self.schema_for(&resource, &declared))
    }

    /// Checks request parameters against the operation's filter schemas.
    pub fn validate_parameters(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<Vec<ParameterViolation>> {
        let schema = self.parameter_schema(operation)?;
        let validator = ParameterValidator::new(&schema)?;
        Ok(validator.validate(context.params()))
    }

    fn schema_for(&self, resource: &ResourceMetadata, declared: &OperationMetadata) -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        for filter_id in declared.filters() {
            if let Some(filter) = self.filters.get(filter_id) {
                schema.extend(filter.description(resource));
            }
        }
        schema
    }

    fn resolve(
        &self,
        operation: &Operation,
        kind: OperationKind,
    ) -> QueryResult<(Arc<ResourceMetadata>, OperationMetadata)> {
        let expected = Operation::new(operation.resource(), operation.name(), kind);
        self.metadata.resolve(&expected)
    }

    fn build_collection(
        &self,
        run: &mut Run<'_>,
        resource: &ResourceMetadata,
        context: &RequestContext,
    ) -> QueryResult<PlannedQuery> {
        let operation = run.operation;

        run.enter(PipelineState::CollectingExtensions);
        let selected: Vec<_> = self
            .extensions
            .collection()
            .filter(|ext| ext.applies_to(resource, operation))
            .collect();

        run.enter(PipelineState::Applying);
        let mut plan = QueryPlan::new(resource.name());
        let mut applied = Vec::with_capacity(selected.len());
        let mut owner: Option<Arc<dyn ResultExtension>> = None;
        for ext in selected {
            ext.apply(&mut plan, resource, operation, context)
                .map_err(|e| build_failure(ext.name(), e))?;
            applied.push(ext.name().to_string());
            if let Some(result) = ext.as_result() {
                if result.supports_result(resource, operation, context) {
                    // later claims replace earlier ones
                    owner = Some(Arc::clone(result));
                }
            }
        }

        Ok(PlannedQuery {
            plan,
            applied,
            identifier: None,
            owner,
        })
    }

    fn build_item(
        &self,
        run: &mut Run<'_>,
        resource: &ResourceMetadata,
        identifier: IdentifierValue,
        context: &RequestContext,
    ) -> QueryResult<PlannedQuery> {
        let operation = run.operation;
        let context = context.clone().with_identifier(identifier.clone());

        run.enter(PipelineState::CollectingExtensions);
        let selected: Vec<_> = self
            .extensions
            .item()
            .filter(|ext| ext.applies_to(resource, operation))
            .collect();

        run.enter(PipelineState::Applying);
        let mut plan = QueryPlan::new(resource.name());
        for (property, value) in identifier.iter() {
            plan.and_where(Condition::eq(property, value.clone()));
        }
        let mut applied = Vec::with_capacity(selected.len());
        for ext in selected {
            ext.apply_to_item(&mut plan, resource, operation, &context)
                .map_err(|e| build_failure(ext.name(), e))?;
            applied.push(ext.name().to_string());
        }

        Ok(PlannedQuery {
            plan,
            applied,
            identifier: Some(identifier),
            owner: None,
        })
    }
}

fn check_filter_bindings(metadata: &MetadataRegistry, filters: &FilterRegistry) -> Result<(), ConfigError> {
    for name in metadata.resource_names() {
        let Ok(resource) = metadata.get(name) else {
            continue;
        };
        for operation in resource.operations() {
            // unregistered ids are skipped at request time
            let bound = operation.filters().iter().filter_map(|id| filters.get(id));
            for filter in bound {
                if let Some(property) = filter
                    .properties()
                    .iter()
                    .find(|p| resource.property_type(p).is_none())
                {
                    return Err(ConfigError::UnknownFilterProperty {
                        resource: resource.name().to_string(),
                        filter_id: filter.name().to_string(),
                        property: property.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn build_failure(extension: &str, error: QueryError) -> QueryError {
    debug!(extension, error = %error, "Extension failed, aborting run");
    QueryBuildFailure::new(extension, error).into()
}

impl fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("metadata", &self.metadata)
            .field("filters", &self.filters)
            .field("extensions", &self.extensions)
            .field("backend", &self.executor.backend_name())
            .finish()
    }
}
