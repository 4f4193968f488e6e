//! Client and default ordering.

use tracing::debug;

use crate::core::{CollectionExtension, Operation, RequestContext};
use crate::error::QueryResult;
use crate::metadata::{OrderConfig, ResourceMetadata};
use crate::types::{QueryPlan, SortDirection, SortKey};

/// Orders collection plans.
///
/// Client order comes from `order[prop]=asc|desc` and `sort=prop,-other`, in
/// that order. Only sortable properties are honored; anything else is
/// skipped. Without a client order the resource default applies. Whenever
/// the plan ends up ordered, identifier properties are appended ascending so
/// that pages are stable.
#[derive(Debug, Clone, Default)]
pub struct OrderExtension {
    config: OrderConfig,
}

impl OrderExtension {
    /// Extension name.
    pub const NAME: &'static str = "order";

    /// Creates the extension.
    pub fn new(config: OrderConfig) -> Self {
        Self { config }
    }

    fn client_order(&self, resource: &ResourceMetadata, context: &RequestContext) -> Vec<SortKey> {
        let mut keys = Vec::new();

        for (property, direction) in context.params().nested(&self.config.order_parameter) {
            let Some(direction) = SortDirection::parse(direction) else {
                debug!(property, direction, "Skipping order with invalid direction");
                continue;
            };
            keys.push(SortKey::new(property, direction));
        }

        for value in context.params().get_all(&self.config.sort_parameter) {
            keys.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(SortKey::parse),
            );
        }

        keys.retain(|key| {
            let sortable = resource.is_sortable(&key.field);
            if !sortable {
                debug!(
                    resource = resource.name(),
                    property = %key.field,
                    "Skipping order on non-sortable property"
                );
            }
            sortable
        });
        keys
    }
}

impl CollectionExtension for OrderExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_to_collection(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        let mut keys = self.client_order(resource, context);
        if keys.is_empty() {
            keys = resource.default_order().to_vec();
        }
        for key in keys {
            plan.order_by(key);
        }

        if !plan.order().is_empty() {
            for property in resource.identifier().properties() {
                plan.order_by(SortKey::asc(property.property.clone()));
            }
        }
        Ok(())
    }
}
