//! Runs the filters bound to an operation.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::core::{CollectionExtension, ItemExtension, Operation, RequestContext};
use crate::error::{FilterError, QueryResult};
use crate::filter::{FilterEffect, FilterRegistry};
use crate::metadata::ResourceMetadata;
use crate::types::QueryPlan;

/// Applies every filter referenced by the operation, in binding order.
///
/// Returned conditions are ANDed into the plan. Unregistered filter ids are
/// logged and skipped.
#[derive(Debug, Clone)]
pub struct FilterExtension {
    filters: Arc<FilterRegistry>,
}

impl FilterExtension {
    /// Extension name.
    pub const NAME: &'static str = "filter";

    /// Creates the extension over a filter registry.
    pub fn new(filters: Arc<FilterRegistry>) -> Self {
        Self { filters }
    }

    fn apply_filters(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        let Some(bound) = resource.operation(operation.name()) else {
            return Ok(());
        };
        for filter_id in bound.filters() {
            let Some(filter) = self.filters.get(filter_id) else {
                let error = FilterError::UnsupportedFilter {
                    filter_id: filter_id.clone(),
                    resource: resource.name().to_string(),
                    operation: operation.name().to_string(),
                };
                warn!(error = %error, "Skipping unsupported filter");
                continue;
            };
            match filter.apply(plan, resource, operation, context)? {
                FilterEffect::Condition(condition) => {
                    trace!(filter = %filter_id, condition = %condition, "Filter added condition");
                    plan.and_where(condition);
                }
                FilterEffect::Applied => {
                    trace!(filter = %filter_id, "Filter mutated plan");
                }
                FilterEffect::Skipped => {}
            }
        }
        Ok(())
    }
}

impl CollectionExtension for FilterExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_to_collection(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        self.apply_filters(plan, resource, operation, context)
    }
}

impl ItemExtension for FilterExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_to_item(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        self.apply_filters(plan, resource, operation, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::DenormalizerChain;
    use crate::metadata::{FilterConfig, FilterKind, OperationConfig, ResourceConfig};
    use crate::types::{IdentifierProperty, ValueType};

    fn setup() -> (FilterExtension, ResourceMetadata) {
        let registry = FilterRegistry::from_configs(
            &[
                FilterConfig::new("status", FilterKind::Exact, ["status"]),
                FilterConfig::new("price", FilterKind::Range, ["price"]),
            ],
            Arc::new(DenormalizerChain::default()),
        )
        .unwrap();
        let resource = ResourceMetadata::from_config(
            ResourceConfig::new("Book", vec![IdentifierProperty::new("id", ValueType::Integer)])
                .with_property("status", ValueType::String)
                .with_property("price", ValueType::Decimal)
                .with_operation(
                    OperationConfig::collection("get_collection")
                        .with_filter("status")
                        .with_filter("missing")
                        .with_filter("price"),
                ),
        )
        .unwrap();
        (FilterExtension::new(Arc::new(registry)), resource)
    }

    #[test]
    fn test_folds_conditions_and_skips_unknown_ids() {
        let (extension, resource) = setup();
        let mut plan = QueryPlan::new("Book");
        extension
            .apply_to_collection(
                &mut plan,
                &resource,
                &Operation::collection("Book", "get_collection"),
                &RequestContext::from_query("status=a&price[gte]=10"),
            )
            .unwrap();
        assert_eq!(plan.conditions().len(), 2);
        assert_eq!(
            plan.to_string(),
            "FROM Book WHERE (status = a AND price >= 10)"
        );
    }

    #[test]
    fn test_filter_error_propagates() {
        let (extension, resource) = setup();
        let mut plan = QueryPlan::new("Book");
        let result = extension.apply_to_collection(
            &mut plan,
            &resource,
            &Operation::collection("Book", "get_collection"),
            &RequestContext::from_query("price[gte]=ten"),
        );
        assert!(result.is_err());
    }
}
